use thiserror::Error;

use crate::config::ElementErrorPolicy;
use crate::error::BoxError;

use super::mapper::Mapper;

/// A single element rejected by a mapper, attributed to the element's
/// position in its batch and the mapper that rejected it.
#[derive(Debug, Error)]
#[error("element {element_index} rejected by mapper {mapper_index} ({mapper}): {error}")]
pub struct ElementFailure {
    pub element_index: usize,
    pub mapper_index: usize,
    pub mapper: String,
    #[source]
    pub error: BoxError,
}

/// Result of pushing one batch through a chain under the skip policy.
#[derive(Debug)]
pub struct MappedBatch<T> {
    /// Surviving elements, in their original relative order.
    pub elements: Vec<T>,
    /// Elements rejected by a mapper and skipped.
    pub failures: Vec<ElementFailure>,
    /// Elements a mapper deliberately dropped.
    pub dropped: usize,
}

/// An ordered list of mappers applied element by element.
///
/// Built from a [`super::MapperFactory`] inside each worker; chains are
/// owned, mutable and never shared.
pub struct MapperChain<T> {
    mappers: Vec<Box<dyn Mapper<T>>>,
}

impl<T> MapperChain<T> {
    pub fn new(mappers: Vec<Box<dyn Mapper<T>>>) -> Self {
        MapperChain { mappers }
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// One element through every mapper in order. `Ok(None)` means some
    /// mapper dropped it; `Err` carries the index of the mapper that
    /// rejected it.
    pub fn apply(&mut self, element: T) -> Result<Option<T>, (usize, BoxError)> {
        let mut current = element;
        for (index, mapper) in self.mappers.iter_mut().enumerate() {
            match mapper.apply(current) {
                Ok(Some(next)) => current = next,
                Ok(None) => return Ok(None),
                Err(error) => return Err((index, error)),
            }
        }
        Ok(Some(current))
    }

    /// A whole batch through the chain.
    ///
    /// Under [`ElementErrorPolicy::Skip`] rejected elements are recorded
    /// and their siblings proceed; under
    /// [`ElementErrorPolicy::FailBatch`] the first rejection fails the
    /// batch and the remaining elements are abandoned.
    pub fn apply_batch(
        &mut self,
        elements: Vec<T>,
        policy: ElementErrorPolicy,
    ) -> Result<MappedBatch<T>, ElementFailure> {
        let mut survivors = Vec::with_capacity(elements.len());
        let mut failures = Vec::new();
        let mut dropped = 0;

        for (element_index, element) in elements.into_iter().enumerate() {
            match self.apply(element) {
                Ok(Some(mapped)) => survivors.push(mapped),
                Ok(None) => dropped += 1,
                Err((mapper_index, error)) => {
                    let failure = ElementFailure {
                        element_index,
                        mapper_index,
                        mapper: self.mappers[mapper_index].name().to_string(),
                        error,
                    };
                    match policy {
                        ElementErrorPolicy::FailBatch => return Err(failure),
                        ElementErrorPolicy::Skip => failures.push(failure),
                    }
                }
            }
        }

        Ok(MappedBatch {
            elements: survivors,
            failures,
            dropped,
        })
    }
}
