//! Bridged logging example: every task logs through one file sink.
//!
//! A stateful mapper logs every tenth element it sees while four
//! workers run concurrently; the bridge keeps the log file readable
//! line by line. The reducer appends delivered elements to a results
//! file.
//!
//! Run with: cargo run --example file_logging

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};

use batchpipe::config::RunConfigBuilder;
use batchpipe::error::BoxError;
use batchpipe::logging::{LogBridge, PipelineLogger};
use batchpipe::mapper::Mapper;
use batchpipe::pipeline::{reducer_fn, Pipeline};
use batchpipe::source::IterStreamer;
use tokio_util::sync::CancellationToken;

/// Mapper that doubles elements and reports its progress.
struct AuditedDouble {
    logger: PipelineLogger,
    seen: u64,
    every: u64,
}

impl Mapper<i64> for AuditedDouble {
    fn apply(&mut self, element: i64) -> Result<Option<i64>, BoxError> {
        self.seen += 1;
        if self.seen % self.every == 0 {
            self.logger.info(
                "audit",
                format!("saw {} elements, latest {element}", self.seen),
            );
        }
        Ok(Some(element * 2))
    }

    fn name(&self) -> &str {
        "audited-double"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let bridge = LogBridge::new(BufWriter::new(File::create("pipeline.log")?));
    let logger = bridge.logger();

    let mut out = BufWriter::new(File::create("results.txt")?);
    let reducer = reducer_fn(move |batch: Vec<i64>| {
        for value in &batch {
            writeln!(out, "{value}")?;
        }
        Ok(())
    });

    let config = RunConfigBuilder::default()
        .batch_size(16usize)
        .pool_size(4usize)
        .log_every_iter(4usize)
        .build()?;

    let pipeline = Pipeline::new(
        move || {
            vec![Box::new(AuditedDouble {
                logger: logger.clone(),
                seen: 0,
                every: 10,
            }) as Box<dyn Mapper<i64>>]
        },
        reducer,
    )
    .add_streamer(IterStreamer::new(1..=300i64))
    .with_config(config)
    .with_logger(bridge.logger());

    let result = pipeline.run(&CancellationToken::new()).await;
    bridge.shutdown().await;

    let summary = result?;
    println!("{summary}");
    println!("audit and progress lines are in pipeline.log, output in results.txt");
    Ok(())
}
