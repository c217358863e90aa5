use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::{ProviderAccount, ProviderBalance};
use crate::records::{Entity, EntityPayload, EntityType};
use crate::transactions::TransactionSyncSummary;

/// Default upper bound for a single provider call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Budget of each individual provider call.
    pub call_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// A fetched account paired with its balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWithBalance {
    pub details: ProviderAccount,
    pub balance: ProviderBalance,
}

/// Step of a reconciliation pass at which a unit of work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    LoadLinks,
    LoadAccounts,
    ListAccounts,
    FetchBalance,
    BindAccount,
    WriteAccount,
    WriteBalance,
    SyncTransactions,
    WriteSyncState,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::LoadLinks => "load links",
            FailureStage::LoadAccounts => "load accounts",
            FailureStage::ListAccounts => "list accounts",
            FailureStage::FetchBalance => "fetch balance",
            FailureStage::BindAccount => "bind account",
            FailureStage::WriteAccount => "write account",
            FailureStage::WriteBalance => "write balance",
            FailureStage::SyncTransactions => "sync transactions",
            FailureStage::WriteSyncState => "write sync state",
        };
        f.write_str(name)
    }
}

/// One isolated failure. The rest of the pass carried on without it.
///
/// Links are identified by enrollment; the access credential never appears
/// in a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileFailure {
    pub stage: FailureStage,
    pub user_id: Option<String>,
    pub enrollment_id: Option<String>,
    pub account_id: Option<String>,
    pub message: String,
}

impl ReconcileFailure {
    pub fn new(stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            user_id: None,
            enrollment_id: None,
            account_id: None,
            message: message.into(),
        }
    }

    pub fn for_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn for_link(self, user_id: &str, enrollment_id: &str) -> Self {
        let mut failure = self.for_user(user_id);
        failure.enrollment_id = Some(enrollment_id.to_string());
        failure
    }

    /// Masks `secret` wherever it appears in the message. Sort keys embed the
    /// access credential, so store errors can carry it.
    pub fn redact(mut self, secret: &str) -> Self {
        if !secret.is_empty() {
            self.message = self.message.replace(secret, "<redacted>");
        }
        self
    }

    pub fn for_account(mut self, account_id: &str) -> Self {
        self.account_id = Some(account_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub links_processed: usize,
    pub links_failed: usize,
    pub accounts_fetched: usize,
    /// Accounts dropped because no matching balance was fetched.
    pub accounts_without_balance: usize,
    /// Accounts whose enrollment did not resolve to any link.
    pub accounts_unbound: usize,
    pub accounts_created: usize,
    pub accounts_existing: usize,
    pub balances_written: usize,
    pub transactions: TransactionSyncSummary,
}

/// Result of a reconciliation pass.
///
/// `accounts` holds every fetched account/balance pair regardless of whether
/// persisting it succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub accounts: Vec<AccountWithBalance>,
    pub summary: ReconcileSummary,
    pub failures: Vec<ReconcileFailure>,
}

/// Result of a sweep that syncs transactions of every persisted account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSweepReport {
    pub accounts_processed: usize,
    pub accounts_failed: usize,
    pub transactions: TransactionSyncSummary,
    pub failures: Vec<ReconcileFailure>,
}

/// `EntityData` of the per-link `Sync` record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_attempt_at: i64,
    /// Last pass without any failure for the link; kept across failing passes.
    #[serde(default)]
    pub last_successful_at: Option<i64>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub accounts_synced: usize,
}

impl EntityPayload for SyncState {
    const ENTITY_TYPE: EntityType = EntityType::Sync;
}

pub type SyncRecord = Entity<SyncState>;
