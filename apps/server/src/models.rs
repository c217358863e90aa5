use serde::{Deserialize, Serialize};

use finlink_core::accounts::CategorizedAccounts;
use finlink_core::provider::ProviderTransaction;
use finlink_core::records::Record;
use finlink_core::reconciliation::{ReconcileFailure, ReconcileSummary, TransactionSweepReport};

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountsResponse {
    pub accounts: CategorizedAccounts,
}

/// The created (or already existing) link, as stored.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountLinkResponse {
    pub account: Record,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<ProviderTransaction>,
}

/// Outcome of a named task run.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskResponse {
    ConsolidateAccountBalances {
        summary: ReconcileSummary,
        failures: Vec<ReconcileFailure>,
    },
    ConsolidateTransactions(TransactionSweepReport),
}
