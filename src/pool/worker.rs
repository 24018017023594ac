use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::ElementErrorPolicy;
use crate::mapper::{ElementFailure, MappedBatch, MapperChain, MapperFactory};
use crate::source::Batch;

/// What a worker reports back for one batch.
#[derive(Debug)]
pub enum BatchOutcome<T> {
    /// The chain ran to completion. May still carry skipped elements.
    Mapped { seq: u64, batch: MappedBatch<T> },
    /// The whole batch was rejected under the fail-batch policy.
    Failed {
        seq: u64,
        batch_len: usize,
        failure: ElementFailure,
    },
    /// The chain panicked while holding this batch. The worker that
    /// reported this has already exited.
    Crashed {
        seq: u64,
        batch_len: usize,
        worker_id: usize,
        panic: String,
    },
}

impl<T> BatchOutcome<T> {
    pub fn seq(&self) -> u64 {
        match self {
            BatchOutcome::Mapped { seq, .. } => *seq,
            BatchOutcome::Failed { seq, .. } => *seq,
            BatchOutcome::Crashed { seq, .. } => *seq,
        }
    }
}

/// Worker loop: build a private chain once, then pull batches off the
/// shared queue until it closes or the token fires.
///
/// Workers share one receiver behind a mutex, so an idle worker steals
/// whatever batch arrives next. A closed queue is drained before the
/// worker exits; a cancelled token abandons whatever is still queued.
pub(crate) async fn run<T>(
    worker_id: usize,
    factory: Arc<dyn MapperFactory<T>>,
    input: Arc<Mutex<mpsc::Receiver<Batch<T>>>>,
    results: mpsc::UnboundedSender<BatchOutcome<T>>,
    policy: ElementErrorPolicy,
    cancel: CancellationToken,
) where
    T: Send + 'static,
{
    // the factory runs user code, so it can panic like any mapper; a
    // silent death here would strand queued batches with no outcome
    let mut chain = match catch_unwind(AssertUnwindSafe(|| MapperChain::new(factory.build()))) {
        Ok(chain) => chain,
        Err(panic) => {
            let panic = panic_message(panic);
            tracing::debug!(worker_id, panic = %panic, "chain construction panicked");
            // report the crash against the next batch so the collector
            // spends a restart on it; with no batch taken there is
            // nothing lost and nothing to report
            if let Some(batch) = next_batch(&input, &cancel).await {
                let _ = results.send(BatchOutcome::Crashed {
                    seq: batch.seq,
                    batch_len: batch.elements.len(),
                    worker_id,
                    panic,
                });
            }
            return;
        }
    };
    tracing::debug!(worker_id, mappers = chain.len(), "worker started");

    loop {
        let batch = match next_batch(&input, &cancel).await {
            Some(batch) => batch,
            None => {
                tracing::debug!(worker_id, "worker stopping");
                return;
            }
        };

        let seq = batch.seq;
        let batch_len = batch.elements.len();

        let outcome = match catch_unwind(AssertUnwindSafe(|| {
            chain.apply_batch(batch.elements, policy)
        })) {
            Ok(Ok(mapped)) => BatchOutcome::Mapped { seq, batch: mapped },
            Ok(Err(failure)) => BatchOutcome::Failed {
                seq,
                batch_len,
                failure,
            },
            Err(panic) => {
                // chain state is suspect after an unwind; report and die,
                // the pool respawns us with a fresh chain
                let outcome = BatchOutcome::Crashed {
                    seq,
                    batch_len,
                    worker_id,
                    panic: panic_message(panic),
                };
                let _ = results.send(outcome);
                return;
            }
        };

        if results.send(outcome).is_err() {
            // collector is gone, nothing left to work for
            return;
        }
    }
}

/// Next batch off the shared queue, or `None` when the queue closes or
/// the token fires.
async fn next_batch<T: Send>(
    input: &Mutex<mpsc::Receiver<Batch<T>>>,
    cancel: &CancellationToken,
) -> Option<Batch<T>> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        batch = async {
            let mut receiver = input.lock().await;
            receiver.recv().await
        } => batch,
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
