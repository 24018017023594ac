use crate::error::BoxError;

/// One transformation step over single elements.
///
/// `Ok(Some(x))` passes `x` downstream, `Ok(None)` drops the element
/// (downstream mappers never see it), `Err` rejects it and lets the
/// element-error policy decide what happens to the rest of the batch.
///
/// Mappers may hold arbitrary mutable state; a chain of them is built
/// per worker from a [`MapperFactory`] and never shared, so `Sync` is
/// not required.
pub trait Mapper<T>: Send {
    fn apply(&mut self, element: T) -> Result<Option<T>, BoxError>;

    /// Label used when a rejection is reported.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<T, F> Mapper<T> for F
where
    F: FnMut(T) -> Result<Option<T>, BoxError> + Send,
{
    fn apply(&mut self, element: T) -> Result<Option<T>, BoxError> {
        self(element)
    }
}

/// Builds a fresh mapper chain for each worker.
///
/// The factory crosses task boundaries instead of the mappers
/// themselves, which is what allows non-shareable mapper state. It must
/// be safe to call any number of times.
pub trait MapperFactory<T>: Send + Sync {
    fn build(&self) -> Vec<Box<dyn Mapper<T>>>;
}

impl<T, F> MapperFactory<T> for F
where
    F: Fn() -> Vec<Box<dyn Mapper<T>>> + Send + Sync,
{
    fn build(&self) -> Vec<Box<dyn Mapper<T>>> {
        self()
    }
}

/// Infallible transformation.
pub fn map_fn<T, F>(mut f: F) -> Box<dyn Mapper<T>>
where
    F: FnMut(T) -> T + Send + 'static,
    T: 'static,
{
    Box::new(move |element: T| -> Result<Option<T>, BoxError> { Ok(Some(f(element))) })
}

/// Keep elements for which the predicate holds.
pub fn filter_fn<T, F>(mut keep: F) -> Box<dyn Mapper<T>>
where
    F: FnMut(&T) -> bool + Send + 'static,
    T: 'static,
{
    Box::new(move |element: T| -> Result<Option<T>, BoxError> {
        Ok(keep(&element).then_some(element))
    })
}

/// Transform and drop in one step.
pub fn filter_map_fn<T, F>(mut f: F) -> Box<dyn Mapper<T>>
where
    F: FnMut(T) -> Option<T> + Send + 'static,
    T: 'static,
{
    Box::new(move |element: T| -> Result<Option<T>, BoxError> { Ok(f(element)) })
}

/// Fallible transformation. Errors are attributed to the element and
/// handled per the run's element-error policy.
pub fn try_map_fn<T, F, E>(mut f: F) -> Box<dyn Mapper<T>>
where
    F: FnMut(T) -> Result<T, E> + Send + 'static,
    E: Into<BoxError>,
    T: 'static,
{
    Box::new(move |element: T| -> Result<Option<T>, BoxError> {
        f(element).map(Some).map_err(Into::into)
    })
}
