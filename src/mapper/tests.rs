use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::ElementErrorPolicy;
use crate::error::BoxError;

use super::{filter_fn, map_fn, try_map_fn, Mapper, MapperChain, MapperFactory};

// Mapper that records every element it sees
struct RecordingMapper {
    seen: Arc<Mutex<Vec<i32>>>,
}

impl Mapper<i32> for RecordingMapper {
    fn apply(&mut self, element: i32) -> Result<Option<i32>, BoxError> {
        self.seen.lock().unwrap().push(element);
        Ok(Some(element))
    }
}

// Mapper with internal state: tags each element with its arrival index
struct IndexingMapper {
    next: i32,
}

impl Mapper<i32> for IndexingMapper {
    fn apply(&mut self, element: i32) -> Result<Option<i32>, BoxError> {
        let tagged = element * 10 + self.next;
        self.next += 1;
        Ok(Some(tagged))
    }
}

// Mapper with a fixed name that rejects one value
struct ParseMapper;

impl Mapper<i32> for ParseMapper {
    fn apply(&mut self, element: i32) -> Result<Option<i32>, BoxError> {
        if element == 3 {
            Err("unparseable".into())
        } else {
            Ok(Some(element))
        }
    }

    fn name(&self) -> &str {
        "parse"
    }
}

#[test]
fn test_chain_applies_in_order() {
    let mut chain = MapperChain::new(vec![map_fn(|x: i32| x + 1), map_fn(|x: i32| x * 2)]);

    // (3 + 1) * 2, not 3 * 2 + 1
    assert_eq!(chain.apply(3).unwrap(), Some(8));
}

#[test]
fn test_dropped_elements_skip_downstream_mappers() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut chain = MapperChain::new(vec![
        filter_fn(|x: &i32| x % 2 == 0),
        Box::new(RecordingMapper { seen: seen.clone() }),
    ]);

    let batch = chain
        .apply_batch(vec![1, 2, 3, 4, 5], ElementErrorPolicy::Skip)
        .unwrap();

    assert_eq!(batch.elements, vec![2, 4]);
    assert_eq!(batch.dropped, 3);
    assert!(batch.failures.is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
}

#[test]
fn test_stateful_mapper_keeps_state_across_elements() {
    let mut chain = MapperChain::new(vec![Box::new(IndexingMapper { next: 0 })]);

    let batch = chain
        .apply_batch(vec![5, 6, 7], ElementErrorPolicy::Skip)
        .unwrap();

    assert_eq!(batch.elements, vec![50, 61, 72]);
}

#[test]
fn test_skip_policy_excludes_failures_and_keeps_siblings() {
    let mut chain = MapperChain::new(vec![try_map_fn(|x: i32| {
        if x == 3 {
            Err("bad value")
        } else {
            Ok(x * 2)
        }
    })]);

    let batch = chain
        .apply_batch(vec![1, 2, 3, 4], ElementErrorPolicy::Skip)
        .unwrap();

    assert_eq!(batch.elements, vec![2, 4, 8]);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].element_index, 2);
    assert_eq!(batch.failures[0].mapper_index, 0);
}

#[test]
fn test_fail_batch_policy_stops_at_first_failure() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut chain = MapperChain::new(vec![
        Box::new(ParseMapper),
        Box::new(RecordingMapper { seen: seen.clone() }),
    ]);

    let failure = chain
        .apply_batch(vec![1, 2, 3, 4], ElementErrorPolicy::FailBatch)
        .unwrap_err();

    assert_eq!(failure.element_index, 2);
    assert_eq!(failure.mapper_index, 0);
    assert_eq!(failure.mapper, "parse");
    // elements after the failure were never touched
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_element_failure_display() {
    let mut chain = MapperChain::new(vec![Box::new(ParseMapper)]);
    let failure = chain
        .apply_batch(vec![3], ElementErrorPolicy::FailBatch)
        .unwrap_err();

    assert_eq!(
        failure.to_string(),
        "element 0 rejected by mapper 0 (parse): unparseable"
    );
}

#[test]
fn test_factory_builds_independent_chains() {
    let builds = Arc::new(AtomicUsize::new(0));
    let builds_clone = builds.clone();

    let factory = move || {
        builds_clone.fetch_add(1, Ordering::SeqCst);
        vec![Box::new(IndexingMapper { next: 0 }) as Box<dyn Mapper<i32>>]
    };

    let mut first = MapperChain::new(factory.build());
    let mut second = MapperChain::new(factory.build());

    assert_eq!(builds.load(Ordering::SeqCst), 2);

    // each chain starts from its own state
    assert_eq!(first.apply(1).unwrap(), Some(10));
    assert_eq!(first.apply(1).unwrap(), Some(11));
    assert_eq!(second.apply(1).unwrap(), Some(10));
}

#[test]
fn test_empty_chain_passes_elements_through() {
    let mut chain: MapperChain<i32> = MapperChain::new(Vec::new());

    let batch = chain
        .apply_batch(vec![1, 2, 3], ElementErrorPolicy::Skip)
        .unwrap();

    assert!(chain.is_empty());
    assert_eq!(batch.elements, vec![1, 2, 3]);
}
