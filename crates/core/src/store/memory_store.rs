//! In-memory store for tests and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::store_traits::{KeyValueStore, PutOutcome};
use crate::errors::{Result, StoreError};
use crate::records::{EntityType, FieldDelta, Record, RecordKey};

/// A `KeyValueStore` backed by an ordered map.
///
/// Records are ordered by (partition key, sort key), which makes prefix queries
/// a contiguous range scan, mirroring how the persistent store behaves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<RecordKey, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<RecordKey, Record>>> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("Memory store lock poisoned".to_string()).into())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        let records = self.lock()?;
        Ok(records.get(&RecordKey::new(partition_key, sort_key)).cloned())
    }

    async fn put_if_absent(&self, record: Record) -> Result<PutOutcome> {
        let mut records = self.lock()?;
        let key = record.key();
        if records.contains_key(&key) {
            return Ok(PutOutcome::AlreadyExists);
        }
        records.insert(key, record);
        Ok(PutOutcome::Created)
    }

    async fn put(&self, record: Record) -> Result<()> {
        let mut records = self.lock()?;
        records.insert(record.key(), record);
        Ok(())
    }

    async fn update_fields(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Vec<FieldDelta>,
    ) -> Result<()> {
        let mut records = self.lock()?;
        let key = RecordKey::new(partition_key, sort_key);
        let record = records
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        // Apply to a copy so a rejected delta leaves the stored record untouched.
        let mut updated = record.clone();
        updated.apply_deltas(&deltas)?;
        *record = updated;
        Ok(())
    }

    async fn query_by_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<Record>> {
        let records = self.lock()?;
        Ok(records
            .range(RecordKey::new(partition_key, sort_key_prefix)..)
            .take_while(|(key, _)| {
                key.partition_key == partition_key && key.sort_key.starts_with(sort_key_prefix)
            })
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn scan_by_type(&self, entity_type: EntityType) -> Result<Vec<Record>> {
        let records = self.lock()?;
        Ok(records
            .values()
            .filter(|record| record.entity_type == entity_type)
            .cloned()
            .collect())
    }
}
