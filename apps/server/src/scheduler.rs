//! Background scheduler and the named tasks it runs.

use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use finlink_core::reconciliation::ReconciliationServiceTrait;

use crate::main_lib::AppState;
use crate::models::TaskResponse;

/// Initial delay before the first run, to let the server fully start.
const INITIAL_DELAY_SECS: u64 = 60;

/// Tasks that can run on a schedule or on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Reconciles accounts and balances of every link.
    ConsolidateAccountBalances,
    /// Syncs transactions of every persisted account.
    ConsolidateTransactions,
}

impl ScheduledTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledTask::ConsolidateAccountBalances => "consolidate_account_balances",
            ScheduledTask::ConsolidateTransactions => "consolidate_transactions",
        }
    }
}

impl FromStr for ScheduledTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consolidate_account_balances" => Ok(ScheduledTask::ConsolidateAccountBalances),
            "consolidate_transactions" => Ok(ScheduledTask::ConsolidateTransactions),
            other => Err(format!("Unknown task '{}'", other)),
        }
    }
}

/// Runs one task to completion. Failures are part of the response, never an error.
pub async fn run_task(state: &AppState, task: ScheduledTask) -> TaskResponse {
    info!("Running task {}", task.as_str());
    match task {
        ScheduledTask::ConsolidateAccountBalances => {
            let report = state.reconciliation_service.reconcile_all().await;
            info!(
                "Task {} finished: {} links, {} accounts created, {} balances written, {} failures",
                task.as_str(),
                report.summary.links_processed,
                report.summary.accounts_created,
                report.summary.balances_written,
                report.failures.len()
            );
            TaskResponse::ConsolidateAccountBalances {
                summary: report.summary,
                failures: report.failures,
            }
        }
        ScheduledTask::ConsolidateTransactions => {
            let report = state.reconciliation_service.sync_all_transactions().await;
            info!(
                "Task {} finished: {} accounts, {} inserted, {} updated, {} failures",
                task.as_str(),
                report.accounts_processed,
                report.transactions.inserted,
                report.transactions.updated,
                report.failures.len()
            );
            TaskResponse::ConsolidateTransactions(report)
        }
    }
}

/// Starts the periodic balance consolidation. A zero period disables it.
pub fn start_sync_scheduler(state: Arc<AppState>, period: Duration) {
    if period.is_zero() {
        info!("Sync scheduler disabled");
        return;
    }

    tokio::spawn(async move {
        info!("Sync scheduler started ({}s interval)", period.as_secs());

        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        // First tick is immediate.
        let mut sync_interval = interval(period);
        loop {
            sync_interval.tick().await;
            if let TaskResponse::ConsolidateAccountBalances { failures, .. } =
                run_task(&state, ScheduledTask::ConsolidateAccountBalances).await
            {
                for failure in failures.iter().take(10) {
                    warn!("Scheduled sync failure at {}: {}", failure.stage, failure.message);
                }
            }
        }
    });
}
