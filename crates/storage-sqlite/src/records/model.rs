//! Database model for records.

use diesel::prelude::*;

use finlink_core::errors::{Error, Result, StoreError};
use finlink_core::records::{EntityType, Record};

/// One row of the `records` table. JSON payloads are stored as text.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::records)]
#[diesel(primary_key(partition_key, sort_key))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RecordDB {
    pub partition_key: String,
    pub sort_key: String,
    pub provider: String,
    pub provider_account_id: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub entity_data: String,
    pub timestamp: i64,
    pub metadata: Option<String>,
}

impl TryFrom<&Record> for RecordDB {
    type Error = Error;

    fn try_from(record: &Record) -> Result<Self> {
        Ok(Self {
            partition_key: record.partition_key.clone(),
            sort_key: record.sort_key.clone(),
            provider: record.provider.clone(),
            provider_account_id: record.provider_account_id.clone(),
            entity_type: record.entity_type.as_str().to_string(),
            entity_id: record.entity_id.clone(),
            entity_data: serde_json::to_string(&record.entity_data)?,
            timestamp: record.timestamp,
            metadata: record
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

impl TryFrom<RecordDB> for Record {
    type Error = Error;

    fn try_from(row: RecordDB) -> Result<Self> {
        let corrupt = |reason: String| StoreError::corrupt(row.sort_key.clone(), reason);

        let entity_type = row
            .entity_type
            .parse::<EntityType>()
            .map_err(|e| corrupt(e.to_string()))?;
        let entity_data = serde_json::from_str(&row.entity_data)
            .map_err(|e| corrupt(format!("invalid EntityData: {}", e)))?;
        let metadata = row
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt(format!("invalid Metadata: {}", e)))?;

        Ok(Record {
            partition_key: row.partition_key,
            sort_key: row.sort_key,
            provider: row.provider,
            provider_account_id: row.provider_account_id,
            entity_type,
            entity_id: row.entity_id,
            entity_data,
            timestamp: row.timestamp,
            metadata,
        })
    }
}
