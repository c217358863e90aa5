//! SQLite storage for the single `records` table.

mod model;
mod repository;

pub use model::RecordDB;
pub use repository::SqliteStore;

// Re-export trait from core for convenience
pub use finlink_core::store::KeyValueStore;
