//! Contract for the key-value persistence collaborator.
//!
//! The store is expected to provide atomic single-item reads and writes plus a
//! conditional "create if absent" write. Nothing here relies on multi-item
//! transactions.

use async_trait::async_trait;

use crate::errors::Result;
use crate::records::{EntityType, FieldDelta, Record};

/// Outcome of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// A record with the same key was already present and was left untouched.
    AlreadyExists,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a single record.
    async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>>;

    /// Writes the record only if its key is not present yet.
    async fn put_if_absent(&self, record: Record) -> Result<PutOutcome>;

    /// Writes the record, replacing any record with the same key.
    async fn put(&self, record: Record) -> Result<()>;

    /// Applies targeted field updates to an existing record.
    ///
    /// Fails with `StoreError::NotFound` when the key is absent.
    async fn update_fields(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Vec<FieldDelta>,
    ) -> Result<()>;

    /// Returns every record of the partition whose sort key starts with
    /// `sort_key_prefix`, ordered by sort key.
    async fn query_by_prefix(&self, partition_key: &str, sort_key_prefix: &str)
        -> Result<Vec<Record>>;

    /// Returns every record of the given type across all partitions.
    async fn scan_by_type(&self, entity_type: EntityType) -> Result<Vec<Record>>;
}
