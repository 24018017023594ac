use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::{PipelineError, RunError};
use crate::logging::PipelineLogger;
use crate::mapper::MapperChain;
use crate::mapper::MapperFactory;
use crate::pool::{BatchOutcome, WorkerPool};
use crate::source::{Batch, Batcher};

use super::reducer::Reducer;
use super::resequencer::Resequencer;
use super::summary::RunSummary;

const LOG_CONTEXT: &str = "pipeline";

/// Bookkeeping around the reducer: resequencing, counters, the
/// element-failure log and the failed-batch limit.
///
/// Lives on the collector task; the reducer is only ever called from
/// here, so it runs strictly one batch at a time in both execution
/// modes.
pub(crate) struct Collector<T> {
    reducer: Box<dyn Reducer<T>>,
    logger: PipelineLogger,
    resequencer: Resequencer<T>,
    log_every_iter: u64,
    max_failed_batches: Option<u64>,
    pub(crate) summary: RunSummary,
}

impl<T: Send + 'static> Collector<T> {
    pub(crate) fn new(
        reducer: Box<dyn Reducer<T>>,
        logger: PipelineLogger,
        config: &RunConfig,
    ) -> Self {
        Collector {
            reducer,
            logger,
            resequencer: Resequencer::new(config.ordering()),
            log_every_iter: config.log_every_iter() as u64,
            max_failed_batches: config.max_failed_batches(),
            summary: RunSummary::default(),
        }
    }

    fn note_dispatched(&mut self, batch: &Batch<T>) {
        self.summary.elements_read += batch.elements.len() as u64;
        self.summary.batches_dispatched += 1;
    }

    /// Outcomes enter here. Strict ordering may hold one back until its
    /// predecessors arrive; whatever is released goes to the reducer.
    async fn absorb(&mut self, outcome: BatchOutcome<T>) -> Result<(), PipelineError> {
        for ready in self.resequencer.push(outcome) {
            self.deliver(ready).await?;
        }
        Ok(())
    }

    async fn deliver(&mut self, outcome: BatchOutcome<T>) -> Result<(), PipelineError> {
        match outcome {
            BatchOutcome::Mapped { seq, batch } => {
                for failure in &batch.failures {
                    self.logger
                        .warn(LOG_CONTEXT, format!("batch {seq}: {failure}"));
                }
                self.summary.elements_failed += batch.failures.len() as u64;
                self.summary.elements_dropped += batch.dropped as u64;

                if batch.elements.is_empty() && !batch.failures.is_empty() {
                    // every element failed out; counting this one
                    // completed would hide the loss
                    return self.record_failed_batch();
                }

                self.summary.elements_delivered += batch.elements.len() as u64;
                match self.reducer.reduce(batch.elements).await {
                    Ok(()) => {
                        self.summary.batches_completed += 1;
                        if (self.summary.batches_completed - 1) % self.log_every_iter == 0 {
                            self.logger.info(
                                LOG_CONTEXT,
                                format!("processed batch {}", self.summary.batches_completed),
                            );
                        }
                        Ok(())
                    }
                    Err(source) => {
                        self.summary.batches_failed += 1;
                        Err(PipelineError::Reducer { seq, source })
                    }
                }
            }

            BatchOutcome::Failed {
                seq,
                batch_len,
                failure,
            } => {
                self.summary.elements_failed += batch_len as u64;
                self.logger
                    .warn(LOG_CONTEXT, format!("batch {seq} failed: {failure}"));
                self.record_failed_batch()
            }

            BatchOutcome::Crashed {
                seq,
                batch_len,
                worker_id,
                panic,
            } => {
                self.summary.elements_failed += batch_len as u64;
                self.logger.error(
                    LOG_CONTEXT,
                    format!("worker {worker_id} crashed on batch {seq}: {panic}"),
                );
                self.record_failed_batch()
            }
        }
    }

    fn record_failed_batch(&mut self) -> Result<(), PipelineError> {
        self.summary.batches_failed += 1;
        if let Some(limit) = self.max_failed_batches {
            if self.summary.batches_failed > limit {
                return Err(PipelineError::TooManyFailedBatches {
                    failed: self.summary.batches_failed,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Final log line, flush, and the run's verdict.
    async fn finish(self, result: Result<(), PipelineError>) -> Result<RunSummary, RunError> {
        match result {
            Ok(()) => {
                tracing::debug!("run completed");
                self.logger
                    .info(LOG_CONTEXT, format!("run complete: {}", self.summary));
                self.logger.flush().await;
                Ok(self.summary)
            }
            Err(source) => {
                tracing::debug!(
                    error = %source,
                    stranded = self.resequencer.pending(),
                    "run aborted"
                );
                self.logger
                    .error(LOG_CONTEXT, format!("run aborted: {source}"));
                self.logger.flush().await;
                Err(RunError {
                    summary: self.summary,
                    source,
                })
            }
        }
    }
}

/// The dispatch loop for parallel runs.
///
/// A producer task keeps one batch read ahead, the pool does the
/// mapping, and this loop moves batches between them while it drains
/// outcomes. New batches are pulled only while fewer than
/// `max_in_flight` are outstanding; batches buffered for resequencing
/// still count, which is what actually bounds memory. When the sources
/// run dry the loop drains what is left, then the run completes.
pub(crate) async fn run_parallel<T>(
    mut batcher: Batcher<T>,
    factory: Arc<dyn MapperFactory<T>>,
    mut collector: Collector<T>,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunError>
where
    T: Send + 'static,
{
    let run_token = cancel.child_token();
    let max_in_flight = config.max_in_flight() as u64;

    let (mut pool, mut results_rx) = WorkerPool::start(
        config.pool_size(),
        config.max_in_flight(),
        factory,
        config.on_element_error(),
        config.max_worker_restarts(),
        &run_token,
    );

    // producer: prepares the next batch while the workers run
    let (batch_tx, mut batch_rx) = mpsc::channel::<Result<Batch<T>, PipelineError>>(1);
    let producer_token = run_token.child_token();
    let producer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = producer_token.cancelled() => break,
                next = batcher.next_batch() => match next {
                    Ok(Some(batch)) => {
                        if batch_tx.send(Ok(batch)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let _ = batch_tx.send(Err(err)).await;
                        break;
                    }
                },
            }
        }
    });

    let mut draining = false;
    let result: Result<(), PipelineError> = loop {
        if draining && collector.summary.in_flight() == 0 {
            break Ok(());
        }

        tokio::select! {
            _ = run_token.cancelled() => break Err(PipelineError::Cancelled),

            next = batch_rx.recv(),
                if !draining && collector.summary.in_flight() < max_in_flight =>
            {
                match next {
                    Some(Ok(batch)) => {
                        collector.note_dispatched(&batch);
                        if let Err(err) = pool.submit(batch).await {
                            break Err(err);
                        }
                    }
                    Some(Err(err)) => break Err(err),
                    None => {
                        tracing::debug!("sources exhausted, draining");
                        draining = true;
                        pool.close_intake();
                    }
                }
            }

            outcome = results_rx.recv() => {
                match outcome {
                    Some(outcome) => {
                        if matches!(outcome, BatchOutcome::Crashed { .. }) {
                            if let Err(err) = pool.restart_worker() {
                                // account the lost batch before aborting
                                let _ = collector.absorb(outcome).await;
                                break Err(err);
                            }
                        }
                        if let Err(err) = collector.absorb(outcome).await {
                            break Err(err);
                        }
                    }
                    None => break Err(PipelineError::PoolClosed),
                }
            }
        }
    };

    if result.is_err() {
        // abandon queued work; the producer unblocks when its channel drops
        run_token.cancel();
    }
    drop(batch_rx);
    pool.shutdown().await;
    let _ = producer.await;

    collector.finish(result).await
}

/// The inline loop for `parallel = false`: one chain on the caller's
/// task, everything else identical to the parallel path. The only
/// differences are timing and isolation: a panicking mapper propagates
/// instead of crashing a worker.
pub(crate) async fn run_sequential<T>(
    mut batcher: Batcher<T>,
    factory: Arc<dyn MapperFactory<T>>,
    mut collector: Collector<T>,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunError>
where
    T: Send + 'static,
{
    let mut chain = MapperChain::new(factory.build());
    let policy = config.on_element_error();

    let result: Result<(), PipelineError> = loop {
        if cancel.is_cancelled() {
            break Err(PipelineError::Cancelled);
        }

        match batcher.next_batch().await {
            Ok(Some(batch)) => {
                collector.note_dispatched(&batch);
                let seq = batch.seq;
                let batch_len = batch.elements.len();

                let outcome = match chain.apply_batch(batch.elements, policy) {
                    Ok(mapped) => BatchOutcome::Mapped { seq, batch: mapped },
                    Err(failure) => BatchOutcome::Failed {
                        seq,
                        batch_len,
                        failure,
                    },
                };

                if let Err(err) = collector.absorb(outcome).await {
                    break Err(err);
                }
            }
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    collector.finish(result).await
}
