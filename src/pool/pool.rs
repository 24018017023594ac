use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ElementErrorPolicy;
use crate::error::PipelineError;
use crate::mapper::MapperFactory;
use crate::source::Batch;

use super::worker::{self, BatchOutcome};

/// A fixed-size pool of worker tasks pulling batches off one shared
/// bounded queue.
///
/// Every worker builds its own mapper chain from the factory at
/// startup, so mappers never need to be shareable. Results come back on
/// an unbounded channel in completion order; the caller is expected to
/// bound how much it submits (the queue depth is sized accordingly), so
/// the results channel can never grow past that bound.
pub struct WorkerPool<T> {
    input_tx: Option<mpsc::Sender<Batch<T>>>,
    input_rx: Arc<Mutex<mpsc::Receiver<Batch<T>>>>,
    results_tx: mpsc::UnboundedSender<BatchOutcome<T>>,
    factory: Arc<dyn MapperFactory<T>>,
    policy: ElementErrorPolicy,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    next_worker_id: usize,
    crashes: usize,
    max_restarts: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `pool_size` workers. `queue_depth` bounds how many
    /// submitted batches can wait unprocessed.
    pub fn start(
        pool_size: usize,
        queue_depth: usize,
        factory: Arc<dyn MapperFactory<T>>,
        policy: ElementErrorPolicy,
        max_restarts: usize,
        cancel: &CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<BatchOutcome<T>>) {
        let (input_tx, input_rx) = mpsc::channel(queue_depth.max(1));
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let mut pool = WorkerPool {
            input_tx: Some(input_tx),
            input_rx: Arc::new(Mutex::new(input_rx)),
            results_tx,
            factory,
            policy,
            cancel: cancel.child_token(),
            workers: Vec::with_capacity(pool_size),
            next_worker_id: 0,
            crashes: 0,
            max_restarts,
        };

        for _ in 0..pool_size {
            pool.spawn_worker();
        }

        (pool, results_rx)
    }

    fn spawn_worker(&mut self) {
        let worker_id = self.next_worker_id;
        self.next_worker_id += 1;

        let handle = tokio::spawn(worker::run(
            worker_id,
            Arc::clone(&self.factory),
            Arc::clone(&self.input_rx),
            self.results_tx.clone(),
            self.policy,
            self.cancel.clone(),
        ));
        self.workers.push(handle);
    }

    /// Queues a batch. Waits only when the queue is full, which is the
    /// pool's backpressure on the dispatcher.
    pub async fn submit(&self, batch: Batch<T>) -> Result<(), PipelineError> {
        match &self.input_tx {
            Some(sender) => sender
                .send(batch)
                .await
                .map_err(|_| PipelineError::PoolClosed),
            None => Err(PipelineError::PoolClosed),
        }
    }

    /// Signals that no more batches are coming. Workers drain what is
    /// queued and exit.
    pub fn close_intake(&mut self) {
        self.input_tx.take();
    }

    /// Replaces a crashed worker with a fresh one, fresh chain
    /// included. Fails once the restart budget is spent.
    pub fn restart_worker(&mut self) -> Result<(), PipelineError> {
        self.crashes += 1;
        if self.crashes > self.max_restarts {
            return Err(PipelineError::WorkerCrash {
                crashes: self.crashes,
            });
        }

        tracing::warn!(
            crashes = self.crashes,
            max_restarts = self.max_restarts,
            "respawning worker after crash"
        );
        self.spawn_worker();
        Ok(())
    }

    /// Panics observed so far.
    pub fn crashes(&self) -> usize {
        self.crashes
    }

    /// Graceful stop: close the intake, let workers finish what is
    /// queued, join them. Idempotent, and safe after [`Self::abort`].
    pub async fn shutdown(&mut self) {
        self.close_intake();
        let workers = std::mem::take(&mut self.workers);
        // join errors mean a worker panicked outside the chain guard;
        // its crash outcome is already on the results channel
        join_all(workers).await;
        tracing::debug!("worker pool shut down");
    }

    /// Hard stop: abandon queued batches, then join the workers.
    pub async fn abort(&mut self) {
        self.cancel.cancel();
        self.shutdown().await;
    }
}
