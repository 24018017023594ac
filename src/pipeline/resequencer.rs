use std::collections::BTreeMap;

use crate::config::OrderingMode;
use crate::pool::BatchOutcome;

/// Restores submission order over outcomes that complete out of order.
///
/// Strict mode buffers everything until the next expected sequence
/// number shows up, then releases the longest possible run. Failed and
/// crashed batches occupy their sequence slot like any other outcome,
/// so a lost batch never stalls the ones behind it. Unordered mode
/// passes outcomes straight through.
pub(crate) struct Resequencer<T> {
    mode: OrderingMode,
    next_seq: u64,
    pending: BTreeMap<u64, BatchOutcome<T>>,
}

impl<T> Resequencer<T> {
    pub(crate) fn new(mode: OrderingMode) -> Self {
        Resequencer {
            mode,
            next_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: BatchOutcome<T>) -> Vec<BatchOutcome<T>> {
        match self.mode {
            OrderingMode::Unordered => vec![outcome],
            OrderingMode::Strict => {
                self.pending.insert(outcome.seq(), outcome);

                let mut ready = Vec::new();
                while let Some(next) = self.pending.remove(&self.next_seq) {
                    ready.push(next);
                    self.next_seq += 1;
                }
                ready
            }
        }
    }

    /// Outcomes buffered waiting for a predecessor.
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::MappedBatch;

    fn outcome(seq: u64) -> BatchOutcome<i32> {
        BatchOutcome::Mapped {
            seq,
            batch: MappedBatch {
                elements: vec![seq as i32],
                failures: Vec::new(),
                dropped: 0,
            },
        }
    }

    fn seqs(outcomes: Vec<BatchOutcome<i32>>) -> Vec<u64> {
        outcomes.iter().map(BatchOutcome::seq).collect()
    }

    #[test]
    fn test_strict_releases_in_submission_order() {
        let mut resequencer = Resequencer::new(OrderingMode::Strict);

        assert!(resequencer.push(outcome(2)).is_empty());
        assert!(resequencer.push(outcome(1)).is_empty());
        assert_eq!(resequencer.pending(), 2);

        assert_eq!(seqs(resequencer.push(outcome(0))), vec![0, 1, 2]);
        assert_eq!(resequencer.pending(), 0);

        assert_eq!(seqs(resequencer.push(outcome(3))), vec![3]);
    }

    #[test]
    fn test_unordered_passes_straight_through() {
        let mut resequencer = Resequencer::new(OrderingMode::Unordered);

        assert_eq!(seqs(resequencer.push(outcome(5))), vec![5]);
        assert_eq!(seqs(resequencer.push(outcome(1))), vec![1]);
        assert_eq!(resequencer.pending(), 0);
    }
}
