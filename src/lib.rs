//! # batchpipe
//!
//! A parallel batch-processing pipeline built on Tokio: stream, batch,
//! map on a worker pool, reduce.
//!
//! ## Features
//!
//! - **Streaming sources** batched without materializing the input
//! - **Per-worker mapper chains** with skip or fail-batch error policies
//! - **Strict output ordering** so parallel runs reproduce sequential output
//! - **Crash isolation** with budgeted worker restarts
//! - **Log bridge** funneling records from every task onto one sink
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batchpipe::mapper::{filter_fn, map_fn};
//! use batchpipe::pipeline::{reducer_fn, Pipeline};
//! use batchpipe::source::IterStreamer;
//! use tokio_util::sync::CancellationToken;
//!
//! // Double every element, keep the even results, print each batch
//! let pipeline = Pipeline::new(
//!     || vec![map_fn(|x: i64| x * 2), filter_fn(|x: &i64| x % 2 == 0)],
//!     reducer_fn(|batch: Vec<i64>| {
//!         println!("{batch:?}");
//!         Ok(())
//!     }),
//! )
//! .add_streamer(IterStreamer::new(0..10_000i64));
//!
//! let summary = pipeline.run(&CancellationToken::new()).await?;
//! println!("{summary}");
//! ```
//!
//! ## Modules
//!
//! - [`source`] - Streamers and the batcher that groups their elements
//! - [`mapper`] - Element transformations and per-worker chains
//! - [`pool`] - Worker tasks running mapper chains over batches
//! - [`pipeline`] - Assembly, the dispatch loop and the reducer seam
//! - [`config`] - Per-run configuration
//! - [`logging`] - Log bridge and the logger handles it hands out
//! - [`error`] - Run-fatal error types

pub mod config;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod pipeline;
pub mod pool;
pub mod source;
