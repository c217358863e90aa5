use async_trait::async_trait;

use super::reconciliation_model::{ReconcileReport, TransactionSweepReport};
use crate::account_links::AccountLink;
use crate::errors::Result;

#[async_trait]
pub trait ReconciliationServiceTrait: Send + Sync {
    /// Fetches accounts and balances for `links` and merges them into the store.
    ///
    /// Never fails as a whole; per-unit failures are collected in the report.
    async fn reconcile(&self, links: &[AccountLink]) -> ReconcileReport;

    /// Reconciles every link of every user. Used by the scheduled job.
    async fn reconcile_all(&self) -> ReconcileReport;

    /// Reconciles the links of one user.
    async fn reconcile_user(&self, user_id: &str) -> Result<ReconcileReport>;

    /// Syncs transactions for every persisted account.
    async fn sync_all_transactions(&self) -> TransactionSweepReport;
}
