use async_trait::async_trait;
use diesel::prelude::*;
use log::debug;
use std::sync::Arc;

use super::model::RecordDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::records;
use finlink_core::errors::{Result, StoreError};
use finlink_core::records::{EntityType, FieldDelta, Record, RecordKey};
use finlink_core::store::{KeyValueStore, PutOutcome};

/// `KeyValueStore` backed by one SQLite table.
///
/// Reads use pooled connections; every write goes through the single writer
/// actor so conditional inserts and read-modify-write updates are serialized.
pub struct SqliteStore {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqliteStore {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        SqliteStore { pool, writer }
    }
}

/// Smallest string greater than every string starting with `prefix`, if any.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = match last as u32 {
            0xD7FF => Some('\u{E000}'),
            code => char::from_u32(code + 1),
        };
        if let Some(next) = next {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

fn rows_to_records(rows: Vec<RecordDB>) -> Result<Vec<Record>> {
    rows.into_iter().map(Record::try_from).collect()
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        let mut conn = get_connection(&self.pool)?;
        let row = records::table
            .find((partition_key, sort_key))
            .select(RecordDB::as_select())
            .first::<RecordDB>(&mut conn)
            .optional()
            .into_core()?;
        row.map(Record::try_from).transpose()
    }

    async fn put_if_absent(&self, record: Record) -> Result<PutOutcome> {
        let row = RecordDB::try_from(&record)?;
        self.writer
            .exec(move |conn| {
                let inserted = diesel::insert_or_ignore_into(records::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                if inserted == 0 {
                    debug!("Conditional insert skipped, {} exists", row.sort_key);
                    Ok(PutOutcome::AlreadyExists)
                } else {
                    Ok(PutOutcome::Created)
                }
            })
            .await
    }

    async fn put(&self, record: Record) -> Result<()> {
        let row = RecordDB::try_from(&record)?;
        self.writer
            .exec(move |conn| {
                diesel::replace_into(records::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn update_fields(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Vec<FieldDelta>,
    ) -> Result<()> {
        let key = RecordKey::new(partition_key, sort_key);
        self.writer
            .exec(move |conn| {
                let row = records::table
                    .find((key.partition_key.as_str(), key.sort_key.as_str()))
                    .select(RecordDB::as_select())
                    .first::<RecordDB>(conn)
                    .optional()
                    .into_core()?
                    .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

                let mut record = Record::try_from(row)?;
                record.apply_deltas(&deltas)?;
                let updated = RecordDB::try_from(&record)?;

                let target =
                    records::table.find((key.partition_key.as_str(), key.sort_key.as_str()));
                diesel::update(target)
                    .set(&updated)
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn query_by_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<Record>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = records::table
            .filter(records::partition_key.eq(partition_key))
            .filter(records::sort_key.ge(sort_key_prefix))
            .order(records::sort_key.asc())
            .select(RecordDB::as_select())
            .into_boxed();
        if let Some(upper) = prefix_upper_bound(sort_key_prefix) {
            query = query.filter(records::sort_key.lt(upper));
        }
        let rows = query.load::<RecordDB>(&mut conn).into_core()?;

        rows_to_records(
            rows.into_iter()
                .filter(|row| row.sort_key.starts_with(sort_key_prefix))
                .collect(),
        )
    }

    async fn scan_by_type(&self, entity_type: EntityType) -> Result<Vec<Record>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = records::table
            .filter(records::entity_type.eq(entity_type.as_str()))
            .order((records::partition_key.asc(), records::sort_key.asc()))
            .select(RecordDB::as_select())
            .load::<RecordDB>(&mut conn)
            .into_core()?;
        rows_to_records(rows)
    }
}
