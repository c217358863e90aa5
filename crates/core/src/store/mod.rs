//! Key-value store access pattern used by the pipeline.

mod memory_store;
mod store_traits;

pub use memory_store::MemoryStore;
pub use store_traits::{KeyValueStore, PutOutcome};
