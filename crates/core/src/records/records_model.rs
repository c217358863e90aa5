//! Record envelope and strongly typed entity views over it.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::keys::sort_key;
use crate::errors::{Error, Result, StoreError, ValidationError};
use crate::utils::time_utils::now_timestamp;

/// Discriminator stored in every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    AccountLink,
    Account,
    Balance,
    Transaction,
    Sync,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::AccountLink => "AccountLink",
            EntityType::Account => "Account",
            EntityType::Balance => "Balance",
            EntityType::Transaction => "Transaction",
            EntityType::Sync => "Sync",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AccountLink" => Ok(EntityType::AccountLink),
            "Account" => Ok(EntityType::Account),
            "Balance" => Ok(EntityType::Balance),
            "Transaction" => Ok(EntityType::Transaction),
            "Sync" => Ok(EntityType::Sync),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown entity type '{}'",
                other
            )))),
        }
    }
}

/// Primary key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl RecordKey {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PK {} SK {}", self.partition_key, self.sort_key)
    }
}

/// The raw persisted envelope.
///
/// `entity_data` is kept as JSON here; use [`Entity`] to read it with a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    pub partition_key: String,
    pub sort_key: String,
    pub provider: String,
    #[serde(rename = "ProviderAccountID")]
    pub provider_account_id: String,
    pub entity_type: EntityType,
    #[serde(rename = "EntityID", default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub entity_data: Value,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Record {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.partition_key.clone(), self.sort_key.clone())
    }

    /// Applies targeted field updates in place.
    ///
    /// Intermediate objects on a data path are created when missing; a path
    /// that runs through a non-object value is rejected.
    pub fn apply_deltas(&mut self, deltas: &[FieldDelta]) -> Result<()> {
        for delta in deltas {
            match delta {
                FieldDelta::Timestamp(ts) => self.timestamp = *ts,
                FieldDelta::Data { path, value } => {
                    let Some((leaf, parents)) = path.split_last() else {
                        return Err(Error::Validation(ValidationError::InvalidInput(
                            "Field delta with an empty path".to_string(),
                        )));
                    };
                    let mut target = &mut self.entity_data;
                    for segment in parents {
                        target = object_mut(target, &self.sort_key)?
                            .entry(segment.clone())
                            .or_insert_with(|| Value::Object(Map::new()));
                    }
                    object_mut(target, &self.sort_key)?.insert(leaf.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

fn object_mut<'a>(value: &'a mut Value, sort_key: &str) -> Result<&'a mut Map<String, Value>> {
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().ok_or_else(|| {
        StoreError::corrupt(sort_key, "field delta path crosses a non-object value").into()
    })
}

/// A targeted update of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    /// Sets a possibly nested field inside `EntityData`.
    Data { path: Vec<String>, value: Value },
    /// Sets the record's last-write time.
    Timestamp(i64),
}

impl FieldDelta {
    pub fn data(path: &[&str], value: impl Into<Value>) -> Self {
        FieldDelta::Data {
            path: path.iter().map(|s| s.to_string()).collect(),
            value: value.into(),
        }
    }

    /// Dotted field name, e.g. `EntityData.details.processing_status`.
    pub fn field_name(&self) -> String {
        match self {
            FieldDelta::Data { path, .. } => format!("EntityData.{}", path.join(".")),
            FieldDelta::Timestamp(_) => "Timestamp".to_string(),
        }
    }
}

/// Schema of the `EntityData` payload for one entity type.
pub trait EntityPayload: Serialize + DeserializeOwned {
    const ENTITY_TYPE: EntityType;
}

/// A record whose `EntityData` has been validated against its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<T> {
    pub partition_key: String,
    pub provider: String,
    pub provider_account_id: String,
    pub entity_id: Option<String>,
    pub data: T,
    pub timestamp: i64,
    pub metadata: Option<Map<String, Value>>,
}

impl<T: EntityPayload> Entity<T> {
    /// Creates an entity stamped with the current time.
    pub fn new(
        partition_key: impl Into<String>,
        provider: impl Into<String>,
        provider_account_id: impl Into<String>,
        entity_id: Option<String>,
        data: T,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            provider: provider.into(),
            provider_account_id: provider_account_id.into(),
            entity_id,
            data,
            timestamp: now_timestamp(),
            metadata: None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        T::ENTITY_TYPE
    }

    pub fn sort_key(&self) -> String {
        sort_key(
            &self.provider,
            T::ENTITY_TYPE,
            &self.provider_account_id,
            self.entity_id.as_deref(),
        )
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.partition_key.clone(), self.sort_key())
    }

    pub fn to_record(&self) -> Result<Record> {
        Ok(Record {
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key(),
            provider: self.provider.clone(),
            provider_account_id: self.provider_account_id.clone(),
            entity_type: T::ENTITY_TYPE,
            entity_id: self.entity_id.clone(),
            entity_data: serde_json::to_value(&self.data)?,
            timestamp: self.timestamp,
            metadata: self.metadata.clone(),
        })
    }

    /// Reads a persisted record, rejecting anything that does not match the
    /// entity type, its payload schema, or its own key layout.
    pub fn from_record(record: Record) -> Result<Self> {
        if record.entity_type != T::ENTITY_TYPE {
            return Err(StoreError::corrupt(
                record.sort_key,
                format!(
                    "expected entity type {}, found {}",
                    T::ENTITY_TYPE,
                    record.entity_type
                ),
            )
            .into());
        }

        let expected_key = sort_key(
            &record.provider,
            T::ENTITY_TYPE,
            &record.provider_account_id,
            record.entity_id.as_deref(),
        );
        if expected_key != record.sort_key {
            return Err(StoreError::corrupt(
                record.sort_key,
                format!("sort key does not match envelope fields ({})", expected_key),
            )
            .into());
        }

        let data = serde_json::from_value::<T>(record.entity_data)
            .map_err(|e| StoreError::corrupt(record.sort_key.clone(), e.to_string()))?;

        Ok(Self {
            partition_key: record.partition_key,
            provider: record.provider,
            provider_account_id: record.provider_account_id,
            entity_id: record.entity_id,
            data,
            timestamp: record.timestamp,
            metadata: record.metadata,
        })
    }
}
