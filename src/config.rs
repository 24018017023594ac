use derive_builder::Builder;

use crate::error::PipelineError;

/// How the batcher pulls from multiple streamers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// One element per live streamer per turn. Batches may span
    /// streamers; only the final batch of the run can be short.
    RoundRobin,
    /// Exhaust streamer i before touching streamer i+1. Batches are cut
    /// at streamer boundaries, so each streamer's last batch may be short.
    Sequential,
}

/// Order in which completed batches reach the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingMode {
    /// Resequence completions so the reducer sees exact submission
    /// order. The parallel run then produces the same output as the
    /// sequential one.
    Strict,
    /// Deliver batches as they finish.
    Unordered,
}

/// What to do when a mapper rejects a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementErrorPolicy {
    /// Exclude the element, log a warning, keep its siblings.
    Skip,
    /// Fail the whole batch on the first rejected element.
    FailBatch,
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RunConfig {
    /// Elements held in memory per batch.
    #[builder(default = "1000")]
    pub(crate) batch_size: usize,

    /// Run mapper chains on a worker pool. When false, everything runs
    /// inline on the caller's task with the same observable behavior.
    #[builder(default = "true")]
    pub(crate) parallel: bool,

    /// Worker tasks when parallel. Ignored otherwise.
    #[builder(default = "num_cpus::get()")]
    pub(crate) pool_size: usize,

    /// Log progress once per this many completed batches.
    #[builder(default = "10_000")]
    pub(crate) log_every_iter: usize,

    #[builder(default = "OrderingMode::Strict")]
    pub(crate) ordering: OrderingMode,

    #[builder(default = "ElementErrorPolicy::Skip")]
    pub(crate) on_element_error: ElementErrorPolicy,

    #[builder(default = "BatchPolicy::RoundRobin")]
    pub(crate) batch_policy: BatchPolicy,

    /// Abort once more than this many batches have failed.
    /// None means failures are counted but never fatal.
    #[builder(default = "None")]
    pub(crate) max_failed_batches: Option<u64>,

    /// Worker respawns after panics before the run aborts.
    #[builder(default = "3")]
    pub(crate) max_worker_restarts: usize,

    /// Batches allowed between the batcher and the reducer.
    /// None means twice the pool size.
    #[builder(default = "None")]
    pub(crate) max_in_flight: Option<usize>,
}

impl RunConfig {
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    #[inline]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[inline]
    pub fn log_every_iter(&self) -> usize {
        self.log_every_iter
    }

    #[inline]
    pub fn ordering(&self) -> OrderingMode {
        self.ordering
    }

    #[inline]
    pub fn on_element_error(&self) -> ElementErrorPolicy {
        self.on_element_error
    }

    #[inline]
    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    #[inline]
    pub fn max_failed_batches(&self) -> Option<u64> {
        self.max_failed_batches
    }

    #[inline]
    pub fn max_worker_restarts(&self) -> usize {
        self.max_worker_restarts
    }

    /// Resolved in-flight bound for this configuration.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.unwrap_or(2 * self.pool_size).max(1)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            batch_size: 1000,
            parallel: true,
            pool_size: num_cpus::get(),
            log_every_iter: 10_000,
            ordering: OrderingMode::Strict,
            on_element_error: ElementErrorPolicy::Skip,
            batch_policy: BatchPolicy::RoundRobin,
            max_failed_batches: None,
            max_worker_restarts: 3,
            max_in_flight: None,
        }
    }
}

impl RunConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.batch_size {
            return Err("batch_size must be at least 1".to_string());
        }
        if let Some(0) = self.pool_size {
            return Err("pool_size must be at least 1".to_string());
        }
        if let Some(0) = self.log_every_iter {
            return Err("log_every_iter must be at least 1".to_string());
        }
        if let Some(Some(0)) = self.max_in_flight {
            return Err("max_in_flight must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<RunConfigBuilderError> for PipelineError {
    fn from(err: RunConfigBuilderError) -> Self {
        PipelineError::Config(err.to_string())
    }
}
