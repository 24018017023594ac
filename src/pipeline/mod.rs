pub mod pipeline;
pub mod reducer;
pub mod summary;

pub(crate) mod collector;
pub(crate) mod resequencer;

pub use pipeline::Pipeline;
pub use reducer::{reducer_fn, Reducer};
pub use summary::RunSummary;
