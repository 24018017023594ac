use std::io::Write;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::logger::{LogRecord, PipelineLogger};

pub(crate) enum BridgeMessage {
    Record(LogRecord),
    Flush(oneshot::Sender<()>),
    Close,
}

/// Funnels log records from every task onto one sink.
///
/// Concurrent writers tear lines when they share a sink directly; the
/// bridge gives the sink to a single consumer task and hands everyone
/// else a [`PipelineLogger`] handle instead. Each record is rendered
/// and written as one line, so output stays readable no matter how many
/// workers log at once.
///
/// The bridge outlives pipeline runs: create it once, pass
/// [`LogBridge::logger`] handles around, and call [`LogBridge::shutdown`]
/// when the program is done with the sink.
pub struct LogBridge {
    sender: mpsc::UnboundedSender<BridgeMessage>,
    consumer: JoinHandle<()>,
}

impl LogBridge {
    /// Spawns the consumer task and transfers `sink` to it. Must be
    /// called from within a tokio runtime.
    pub fn new<W>(sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(Self::consume(receiver, sink));

        LogBridge { sender, consumer }
    }

    /// A handle that feeds this bridge. Clones freely.
    pub fn logger(&self) -> PipelineLogger {
        PipelineLogger::bridged(self.sender.clone())
    }

    /// Waits until every record sent so far has been written.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(BridgeMessage::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Writes everything already queued, then releases the sink.
    /// Records sent by surviving handles afterwards are discarded.
    pub async fn shutdown(self) {
        let _ = self.sender.send(BridgeMessage::Close);
        let _ = self.consumer.await;
    }

    async fn consume<W>(mut receiver: mpsc::UnboundedReceiver<BridgeMessage>, mut sink: W)
    where
        W: Write + Send + 'static,
    {
        while let Some(message) = receiver.recv().await {
            match message {
                BridgeMessage::Record(record) => {
                    let line = format!("[{}] {}: {}\n", record.level, record.context, record.message);
                    if sink.write_all(line.as_bytes()).is_err() {
                        // sink is gone; keep draining so senders never block
                        continue;
                    }
                }
                BridgeMessage::Flush(ack) => {
                    let _ = sink.flush();
                    let _ = ack.send(());
                }
                BridgeMessage::Close => break,
            }
        }
        let _ = sink.flush();
    }
}
