//! SQLite storage implementation for finlink.
//!
//! This crate is the only place where Diesel dependencies exist. It provides:
//! - Database connection pooling and pragmas
//! - Embedded Diesel migrations
//! - The single-writer actor that serializes writes
//! - [`SqliteStore`], the `KeyValueStore` implementation over the `records` table
//!
//! ```text
//! finlink-core (KeyValueStore trait)
//!          │
//!          ▼
//!  storage-sqlite (this crate)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod records;
pub mod schema;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};
pub use records::SqliteStore;

pub use finlink_core::errors::{Error, Result};
