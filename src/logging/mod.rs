pub mod bridge;
pub mod logger;

pub use bridge::LogBridge;
pub use logger::{LogLevel, LogRecord, PipelineLogger};

#[cfg(test)]
mod tests;
