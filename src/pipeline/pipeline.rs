use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::RunError;
use crate::logging::PipelineLogger;
use crate::mapper::MapperFactory;
use crate::source::{Batcher, Streamer};

use super::collector::{self, Collector};
use super::reducer::Reducer;
use super::summary::RunSummary;

/// An assembled pipeline: streamers in, a mapper chain per worker, one
/// reducer out.
///
/// Running consumes the pipeline, so a spent run can never be started
/// twice against already-consumed streamers.
pub struct Pipeline<T> {
    streamers: Vec<Box<dyn Streamer<T>>>,
    factory: Arc<dyn MapperFactory<T>>,
    reducer: Box<dyn Reducer<T>>,
    config: RunConfig,
    logger: PipelineLogger,
}

impl<T: Send + 'static> Pipeline<T> {
    /// A pipeline with default configuration, no streamers yet and
    /// logging routed to `tracing`.
    pub fn new<F, R>(factory: F, reducer: R) -> Self
    where
        F: MapperFactory<T> + 'static,
        R: Reducer<T> + 'static,
    {
        Pipeline {
            streamers: Vec::new(),
            factory: Arc::new(factory),
            reducer: Box::new(reducer),
            config: RunConfig::default(),
            logger: PipelineLogger::to_tracing(),
        }
    }

    /// Appends a streamer. Order matters: it fixes the index reported
    /// by read errors and the polling order of both batching policies.
    pub fn add_streamer(mut self, streamer: impl Streamer<T> + 'static) -> Self {
        self.streamers.push(Box::new(streamer));
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_logger(mut self, logger: PipelineLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Runs the pipeline to completion or abort.
    ///
    /// Cancelling the token aborts the run: workers finish the batch
    /// they are holding, queued work is abandoned, and the error
    /// carries whatever the counters said at that point. A pipeline
    /// with no streamers (or only empty ones) completes immediately
    /// with an all-zero summary.
    pub async fn run(self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        let Pipeline {
            streamers,
            factory,
            reducer,
            config,
            logger,
        } = self;

        tracing::debug!(
            streamers = streamers.len(),
            batch_size = config.batch_size(),
            parallel = config.parallel(),
            pool_size = config.pool_size(),
            "starting pipeline run"
        );

        let batcher = Batcher::new(streamers, config.batch_policy(), config.batch_size());
        let collector = Collector::new(reducer, logger, &config);

        if config.parallel() {
            collector::run_parallel(batcher, factory, collector, &config, cancel).await
        } else {
            collector::run_sequential(batcher, factory, collector, &config, cancel).await
        }
    }
}
