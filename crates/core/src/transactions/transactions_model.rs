use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::provider::ProviderTransaction;
use crate::records::FieldDelta;

/// Payload fields compared between a persisted and a freshly fetched
/// transaction. Nothing else is ever patched.
pub const MONITORED_FIELDS: &[&[&str]] = &[
    &["amount"],
    &["details", "processing_status"],
    &["status"],
    &["date"],
    &["running_balance"],
];

/// Counters of one account's transaction sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSyncSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl TransactionSyncSummary {
    pub fn merge(&mut self, other: &TransactionSyncSummary) {
        self.fetched += other.fetched;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.get(*segment))
}

/// Computes the minimal patch turning `persisted` into `fetched`.
///
/// Values are compared in their stored form, so "10.00" and "10.0" differ.
/// Returns an empty list when no monitored field changed; otherwise the
/// changed fields followed by a `Timestamp` delta set to `now`.
pub fn transaction_deltas(
    persisted: &ProviderTransaction,
    fetched: &ProviderTransaction,
    now: i64,
) -> Result<Vec<FieldDelta>> {
    let persisted = serde_json::to_value(persisted)?;
    let fetched = serde_json::to_value(fetched)?;

    let mut deltas: Vec<FieldDelta> = MONITORED_FIELDS
        .iter()
        .filter_map(|path| {
            let new_value = field(&fetched, path)?;
            if field(&persisted, path) == Some(new_value) {
                None
            } else {
                Some(FieldDelta::data(path, new_value.clone()))
            }
        })
        .collect();

    if !deltas.is_empty() {
        deltas.push(FieldDelta::Timestamp(now));
    }
    Ok(deltas)
}
