pub mod batcher;
pub mod streamer;

pub use batcher::{Batch, Batcher};
pub use streamer::{IterStreamer, Streamer};
