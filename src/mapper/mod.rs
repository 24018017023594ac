pub mod chain;
pub mod mapper;

pub use chain::{ElementFailure, MappedBatch, MapperChain};
pub use mapper::{filter_fn, filter_map_fn, map_fn, try_map_fn, Mapper, MapperFactory};

#[cfg(test)]
mod tests;
