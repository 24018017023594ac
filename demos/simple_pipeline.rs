//! Simple pipeline example demonstrating batchpipe.
//!
//! Streams two integer ranges round-robin, doubles every element on a
//! worker pool, drops multiples of three and prints each delivered
//! batch.
//!
//! Run with: cargo run --example simple_pipeline

use std::error::Error;

use batchpipe::config::RunConfigBuilder;
use batchpipe::mapper::{filter_fn, map_fn};
use batchpipe::pipeline::{reducer_fn, Pipeline};
use batchpipe::source::IterStreamer;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing for logs
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = RunConfigBuilder::default()
        .batch_size(8usize)
        .pool_size(4usize)
        .log_every_iter(1usize)
        .build()?;

    let pipeline = Pipeline::new(
        || vec![map_fn(|x: i64| x * 2), filter_fn(|x: &i64| x % 3 != 0)],
        reducer_fn(|batch: Vec<i64>| {
            println!("reduced batch: {batch:?}");
            Ok(())
        }),
    )
    .add_streamer(IterStreamer::new(1..=40i64))
    .add_streamer(IterStreamer::new(100..=120i64))
    .with_config(config);

    println!("\nRunning pipeline:");
    println!("- Streaming 1-40 and 100-120 round-robin");
    println!("- Doubling on 4 workers");
    println!("- Dropping multiples of three\n");

    let cancel = CancellationToken::new();
    let summary = pipeline.run(&cancel).await?;

    println!("\n{summary}");
    Ok(())
}
