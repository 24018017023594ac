use std::fmt;

/// Counters accumulated over one run.
///
/// On a completed run the element counters always reconcile:
/// `elements_read == elements_delivered + elements_dropped +
/// elements_failed`. Elements lost with a failed or crashed batch count
/// as failed. On an aborted run the counters cover everything that
/// happened up to the abort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Elements pulled out of streamers and dispatched in batches.
    pub elements_read: u64,
    /// Elements that reached the reducer.
    pub elements_delivered: u64,
    /// Elements deliberately dropped by a mapper.
    pub elements_dropped: u64,
    /// Elements rejected by a mapper or lost with their batch.
    pub elements_failed: u64,
    /// Batches handed to the workers (or the inline chain).
    pub batches_dispatched: u64,
    /// Batches the reducer accepted.
    pub batches_completed: u64,
    /// Batches that failed, crashed or had no survivors.
    pub batches_failed: u64,
}

impl RunSummary {
    /// Batches dispatched but not yet accounted completed or failed.
    pub(crate) fn in_flight(&self) -> u64 {
        self.batches_dispatched - self.batches_completed - self.batches_failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {} elements in {} batches: {} completed, {} failed ({} delivered, {} dropped, {} failed elements)",
            self.elements_read,
            self.batches_dispatched,
            self.batches_completed,
            self.batches_failed,
            self.elements_delivered,
            self.elements_dropped,
            self.elements_failed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reads_naturally() {
        let summary = RunSummary {
            elements_read: 100,
            elements_delivered: 95,
            elements_dropped: 3,
            elements_failed: 2,
            batches_dispatched: 10,
            batches_completed: 9,
            batches_failed: 1,
        };

        assert_eq!(
            summary.to_string(),
            "read 100 elements in 10 batches: 9 completed, 1 failed \
             (95 delivered, 3 dropped, 2 failed elements)"
        );
    }

    #[test]
    fn test_in_flight_tracks_unaccounted_batches() {
        let mut summary = RunSummary::default();
        summary.batches_dispatched = 5;
        summary.batches_completed = 2;
        summary.batches_failed = 1;

        assert_eq!(summary.in_flight(), 2);
    }
}
