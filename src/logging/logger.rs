use std::fmt;

use tokio::sync::{mpsc, oneshot};

use super::bridge::BridgeMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One log line: level, emitting context and message.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub context: String,
    pub message: String,
}

/// Cheap, cloneable handle for emitting log records from anywhere in
/// the pipeline, including user mappers running inside workers.
///
/// Backed either by a [`super::LogBridge`] (records funnel to the
/// single task owning the sink) or by `tracing` events when no bridge
/// is installed. Sends never block and never fail; records emitted
/// after a bridge shut down are discarded.
#[derive(Clone)]
pub struct PipelineLogger {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Tracing,
    Bridge(mpsc::UnboundedSender<BridgeMessage>),
}

impl PipelineLogger {
    /// Logger that forwards to the `tracing` subscriber, if any. This
    /// is the default when a pipeline is given no logger.
    pub fn to_tracing() -> Self {
        PipelineLogger {
            backend: Backend::Tracing,
        }
    }

    pub(crate) fn bridged(sender: mpsc::UnboundedSender<BridgeMessage>) -> Self {
        PipelineLogger {
            backend: Backend::Bridge(sender),
        }
    }

    pub fn log(&self, level: LogLevel, context: impl Into<String>, message: impl Into<String>) {
        let record = LogRecord {
            level,
            context: context.into(),
            message: message.into(),
        };

        match &self.backend {
            Backend::Bridge(sender) => {
                let _ = sender.send(BridgeMessage::Record(record));
            }
            Backend::Tracing => match record.level {
                LogLevel::Debug => {
                    tracing::debug!(context = %record.context, "{}", record.message)
                }
                LogLevel::Info => tracing::info!(context = %record.context, "{}", record.message),
                LogLevel::Warn => tracing::warn!(context = %record.context, "{}", record.message),
                LogLevel::Error => {
                    tracing::error!(context = %record.context, "{}", record.message)
                }
            },
        }
    }

    pub fn debug(&self, context: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Debug, context, message);
    }

    pub fn info(&self, context: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Info, context, message);
    }

    pub fn warn(&self, context: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Warn, context, message);
    }

    pub fn error(&self, context: impl Into<String>, message: impl Into<String>) {
        self.log(LogLevel::Error, context, message);
    }

    /// Waits until every record sent through this handle so far has
    /// reached the sink. A no-op for the tracing backend.
    pub async fn flush(&self) {
        if let Backend::Bridge(sender) = &self.backend {
            let (ack, done) = oneshot::channel();
            if sender.send(BridgeMessage::Flush(ack)).is_ok() {
                let _ = done.await;
            }
        }
    }
}
