use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use super::transactions_model::{transaction_deltas, TransactionSyncSummary};
use super::transactions_traits::TransactionSyncServiceTrait;
use crate::errors::Result;
use crate::provider::{AccountProviderClient, AccountRecord, ProviderTransaction, TransactionRecord};
use crate::records::{EntityType, SORT_KEY_ROOT};
use crate::store::{KeyValueStore, PutOutcome};
use crate::utils::call_timeout::with_timeout;
use crate::utils::time_utils::now_timestamp;

/// What happened to a single fetched transaction.
enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
}

pub struct TransactionSyncService {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn AccountProviderClient>,
    call_timeout: Duration,
}

impl TransactionSyncService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AccountProviderClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            call_timeout,
        }
    }

    async fn merge_transaction(
        &self,
        account: &AccountRecord,
        fetched: ProviderTransaction,
    ) -> Result<MergeOutcome> {
        let incoming = TransactionRecord::new(
            account.partition_key.clone(),
            account.provider.clone(),
            account.provider_account_id.clone(),
            Some(fetched.id.clone()),
            fetched,
        );
        let key = incoming.key();

        let Some(existing) = self.store.get(&key.partition_key, &key.sort_key).await? else {
            return match self.store.put_if_absent(incoming.to_record()?).await? {
                PutOutcome::Created => Ok(MergeOutcome::Inserted),
                PutOutcome::AlreadyExists => {
                    warn!("Transaction {} was inserted concurrently, leaving it", key);
                    Ok(MergeOutcome::Unchanged)
                }
            };
        };

        let persisted = TransactionRecord::from_record(existing)?;
        let deltas = transaction_deltas(&persisted.data, &incoming.data, now_timestamp())?;
        if deltas.is_empty() {
            return Ok(MergeOutcome::Unchanged);
        }

        debug!(
            "Patching {}: {}",
            key,
            deltas
                .iter()
                .map(|d| d.field_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.store
            .update_fields(&key.partition_key, &key.sort_key, deltas)
            .await?;
        Ok(MergeOutcome::Updated)
    }
}

#[async_trait]
impl TransactionSyncServiceTrait for TransactionSyncService {
    async fn sync_transactions(&self, account: &AccountRecord) -> Result<TransactionSyncSummary> {
        let account_id = account.data.id.as_str();
        let fetched = with_timeout(
            self.call_timeout,
            "list transactions",
            self.provider
                .list_transactions(&account.provider_account_id, account_id),
        )
        .await?;

        let mut summary = TransactionSyncSummary {
            fetched: fetched.len(),
            ..Default::default()
        };

        for txn in fetched {
            let txn_id = txn.id.clone();
            match self.merge_transaction(account, txn).await {
                Ok(MergeOutcome::Inserted) => summary.inserted += 1,
                Ok(MergeOutcome::Updated) => summary.updated += 1,
                Ok(MergeOutcome::Unchanged) => summary.unchanged += 1,
                Err(e) => {
                    error!(
                        "Failed to sync transaction {} of account {}: {}",
                        txn_id, account_id, e
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Synced transactions for account {}: {} fetched, {} inserted, {} updated, {} failed",
            account_id, summary.fetched, summary.inserted, summary.updated, summary.failed
        );
        Ok(summary)
    }

    async fn get_transactions(&self, user_id: &str) -> Result<Vec<TransactionRecord>> {
        let records = self.store.query_by_prefix(user_id, SORT_KEY_ROOT).await?;

        let mut transactions: Vec<TransactionRecord> = records
            .into_iter()
            .filter(|record| record.entity_type == EntityType::Transaction)
            .filter_map(|record| match TransactionRecord::from_record(record) {
                Ok(txn) => Some(txn),
                Err(e) => {
                    error!("Skipping unreadable transaction for user {}: {}", user_id, e);
                    None
                }
            })
            .collect();

        // ISO dates order lexicographically.
        transactions.sort_by(|a, b| {
            Reverse(&a.data.date)
                .cmp(&Reverse(&b.data.date))
                .then_with(|| a.data.id.cmp(&b.data.id))
        });
        Ok(transactions)
    }
}
