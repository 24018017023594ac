use thiserror::Error;

use crate::pipeline::RunSummary;

/// Boxed error type carried by streamers, mappers and reducers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors that abort a pipeline run.
///
/// Per-element mapper failures are not here: they are recoverable and
/// surface as [`crate::mapper::ElementFailure`] values inside batch
/// outcomes. Everything in this enum stops the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid configuration or pipeline assembly.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A streamer failed while being read.
    ///
    /// Preserves the source error and the index of the offending
    /// streamer in the order they were supplied.
    #[error("streamer {index} failed")]
    StreamerRead {
        index: usize,
        #[source]
        source: BoxError,
    },

    /// The reducer rejected a batch. The sink is authoritative, so this
    /// is always fatal.
    #[error("reducer failed on batch {seq}")]
    Reducer {
        seq: u64,
        #[source]
        source: BoxError,
    },

    /// More batches failed than `max_failed_batches` allows.
    #[error("{failed} failed batches exceeded the limit of {limit}")]
    TooManyFailedBatches { failed: u64, limit: u64 },

    /// Workers panicked more often than the restart budget covers.
    #[error("workers crashed {crashes} times, restart budget exhausted")]
    WorkerCrash { crashes: usize },

    /// The worker pool stopped accepting batches.
    #[error("worker pool input closed")]
    PoolClosed,

    /// The run was cancelled via its cancellation token.
    #[error("run cancelled")]
    Cancelled,
}

/// An aborted run: the triggering error plus the counters accumulated
/// up to the abort.
#[derive(Debug, Error)]
#[error("pipeline aborted: {source}")]
pub struct RunError {
    pub summary: RunSummary,
    #[source]
    pub source: PipelineError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_streamer_read_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = PipelineError::StreamerRead {
            index: 2,
            source: Box::new(source),
        };

        assert_eq!(err.to_string(), "streamer 2 failed");
        assert_eq!(err.source().unwrap().to_string(), "disk gone");
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::TooManyFailedBatches {
            failed: 4,
            limit: 3,
        };
        assert_eq!(err.to_string(), "4 failed batches exceeded the limit of 3");

        let err = PipelineError::WorkerCrash { crashes: 5 };
        assert_eq!(
            err.to_string(),
            "workers crashed 5 times, restart budget exhausted"
        );

        let err = PipelineError::Cancelled;
        assert_eq!(err.to_string(), "run cancelled");
    }

    #[test]
    fn test_run_error_carries_summary_and_source() {
        let err = RunError {
            summary: RunSummary::default(),
            source: PipelineError::Cancelled,
        };

        assert_eq!(err.to_string(), "pipeline aborted: run cancelled");
        assert_eq!(err.summary.batches_completed, 0);
        assert!(err.source().is_some());
    }
}
