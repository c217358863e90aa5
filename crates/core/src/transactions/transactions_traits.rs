use async_trait::async_trait;

use super::transactions_model::TransactionSyncSummary;
use crate::errors::Result;
use crate::provider::{AccountRecord, TransactionRecord};

#[async_trait]
pub trait TransactionSyncServiceTrait: Send + Sync {
    /// Fetches the account's transactions and merges them into the store.
    ///
    /// Failing to fetch is an error; failures on individual transactions are
    /// counted in the summary instead.
    async fn sync_transactions(&self, account: &AccountRecord) -> Result<TransactionSyncSummary>;

    /// All persisted transactions of a user, newest first.
    async fn get_transactions(&self, user_id: &str) -> Result<Vec<TransactionRecord>>;
}
