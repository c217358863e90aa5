use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error, info, warn};

use super::reconciliation_model::{
    AccountWithBalance, FailureStage, ReconcileConfig, ReconcileFailure, ReconcileReport,
    SyncRecord, SyncState, TransactionSweepReport,
};
use super::reconciliation_traits::ReconciliationServiceTrait;
use crate::account_links::{AccountLink, AccountLinkServiceTrait};
use crate::errors::Result;
use crate::provider::{
    AccountProviderClient, AccountRecord, BalanceRecord, ProviderAccount, ProviderBalance,
};
use crate::records::{EntityType, RecordKey};
use crate::store::{KeyValueStore, PutOutcome};
use crate::transactions::{TransactionSyncServiceTrait, TransactionSyncSummary};
use crate::utils::call_timeout::with_timeout;
use crate::utils::time_utils::now_timestamp;

/// Provider state fetched through one link.
struct LinkFetch {
    accounts: Vec<ProviderAccount>,
    balances: Vec<ProviderBalance>,
    failures: Vec<ReconcileFailure>,
}

/// A pair scheduled for persistence, with the link that fetched it.
struct WriteUnit<'a> {
    origin: usize,
    owner: &'a AccountLink,
    pair: AccountWithBalance,
}

#[derive(Default)]
struct WriteOutcome {
    created: Option<bool>,
    balance_written: bool,
    transactions: Option<TransactionSyncSummary>,
    failures: Vec<ReconcileFailure>,
}

/// Per-link bookkeeping for the `Sync` record.
#[derive(Default)]
struct LinkProgress {
    errors: Vec<String>,
    accounts_synced: usize,
}

pub struct ReconciliationService {
    store: Arc<dyn KeyValueStore>,
    provider: Arc<dyn AccountProviderClient>,
    account_links: Arc<dyn AccountLinkServiceTrait>,
    transactions: Arc<dyn TransactionSyncServiceTrait>,
    config: ReconcileConfig,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AccountProviderClient>,
        account_links: Arc<dyn AccountLinkServiceTrait>,
        transactions: Arc<dyn TransactionSyncServiceTrait>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            provider,
            account_links,
            transactions,
            config,
        }
    }

    /// Lists the link's accounts, then fetches every balance concurrently.
    async fn fetch_link(&self, link: &AccountLink) -> LinkFetch {
        let credential = link.provider_account_id.as_str();
        let link_failure = |stage: FailureStage, message: String| {
            ReconcileFailure::new(stage, message)
                .for_link(&link.partition_key, &link.data.enrollment_id)
                .redact(credential)
        };

        let accounts = match with_timeout(
            self.config.call_timeout,
            "list accounts",
            self.provider.list_accounts(credential),
        )
        .await
        {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(
                    "Failed to list accounts for link {} of user {}: {}",
                    link.data.enrollment_id, link.partition_key, e
                );
                return LinkFetch {
                    accounts: Vec::new(),
                    balances: Vec::new(),
                    failures: vec![link_failure(FailureStage::ListAccounts, e.to_string())],
                };
            }
        };

        let results = join_all(accounts.iter().map(|account| async move {
            let balance = with_timeout(
                self.config.call_timeout,
                "fetch balance",
                self.provider.get_balance(credential, &account.id),
            )
            .await;
            (account.id.as_str(), balance)
        }))
        .await;

        let mut balances = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (account_id, result) in results {
            match result {
                Ok(balance) => balances.push(balance),
                Err(e) => {
                    error!("Failed to fetch balance for account {}: {}", account_id, e);
                    failures.push(
                        link_failure(FailureStage::FetchBalance, e.to_string())
                            .for_account(account_id),
                    );
                }
            }
        }

        LinkFetch {
            accounts,
            balances,
            failures,
        }
    }

    /// Writes one account/balance pair under its owning link.
    async fn persist_pair(&self, owner: &AccountLink, pair: &AccountWithBalance) -> WriteOutcome {
        let account_id = pair.details.id.as_str();
        let failure = |stage: FailureStage, message: String| {
            ReconcileFailure::new(stage, message)
                .for_link(&owner.partition_key, &owner.data.enrollment_id)
                .for_account(account_id)
                .redact(&owner.provider_account_id)
        };
        let mut outcome = WriteOutcome::default();

        let account = AccountRecord::new(
            owner.partition_key.clone(),
            owner.provider.clone(),
            owner.provider_account_id.clone(),
            Some(pair.details.id.clone()),
            pair.details.clone(),
        );
        let created = match self.write_account(&account).await {
            Ok(PutOutcome::Created) => {
                info!("Created account {} for user {}", account_id, owner.partition_key);
                true
            }
            Ok(PutOutcome::AlreadyExists) => {
                warn!("Account already exists: {}", account.key());
                false
            }
            Err(e) => {
                error!("Failed to write account {}: {}", account.key(), e);
                outcome
                    .failures
                    .push(failure(FailureStage::WriteAccount, e.to_string()));
                return outcome;
            }
        };
        outcome.created = Some(created);

        let balance = BalanceRecord::new(
            owner.partition_key.clone(),
            owner.provider.clone(),
            owner.provider_account_id.clone(),
            Some(pair.details.id.clone()),
            pair.balance.clone(),
        );
        match self.write_balance(&balance).await {
            Ok(()) => outcome.balance_written = true,
            Err(e) => {
                error!("Failed to write balance {}: {}", balance.key(), e);
                outcome
                    .failures
                    .push(failure(FailureStage::WriteBalance, e.to_string()));
            }
        }

        if created {
            match self.transactions.sync_transactions(&account).await {
                Ok(summary) => outcome.transactions = Some(summary),
                Err(e) => {
                    error!("Failed to sync transactions for account {}: {}", account_id, e);
                    outcome
                        .failures
                        .push(failure(FailureStage::SyncTransactions, e.to_string()));
                }
            }
        }

        outcome
    }

    async fn write_account(&self, account: &AccountRecord) -> Result<PutOutcome> {
        self.store.put_if_absent(account.to_record()?).await
    }

    async fn write_balance(&self, balance: &BalanceRecord) -> Result<()> {
        self.store.put(balance.to_record()?).await
    }

    /// Records the outcome of this pass for one link, keeping the previous
    /// success time when the pass failed.
    async fn record_sync_state(&self, link: &AccountLink, progress: &LinkProgress) -> Result<()> {
        let now = now_timestamp();
        let mut record = SyncRecord::new(
            link.partition_key.clone(),
            link.provider.clone(),
            link.provider_account_id.clone(),
            None,
            SyncState::default(),
        );
        let key = record.key();

        let previous_success = match self.store.get(&key.partition_key, &key.sort_key).await? {
            Some(existing) => match SyncRecord::from_record(existing) {
                Ok(state) => state.data.last_successful_at,
                Err(e) => {
                    warn!("Replacing unreadable sync state {}: {}", key, e);
                    None
                }
            },
            None => None,
        };

        record.data = SyncState {
            last_attempt_at: now,
            last_successful_at: if progress.errors.is_empty() {
                Some(now)
            } else {
                previous_success
            },
            last_error: if progress.errors.is_empty() {
                None
            } else {
                Some(progress.errors.join("; "))
            },
            accounts_synced: progress.accounts_synced,
        };
        record.timestamp = now;
        self.store.put(record.to_record()?).await
    }
}

/// Maps `(user, enrollment id)` to the link that owns the enrollment.
///
/// Enrollment ids are only unique per user, so an account is never bound
/// across partitions. Links are visited in key order so an enrollment linked
/// twice by the same user always binds to the same link.
fn enrollment_index(links: &[AccountLink]) -> HashMap<(&str, &str), &AccountLink> {
    let mut ordered: Vec<&AccountLink> = links.iter().collect();
    ordered.sort_by_key(|link| link.key());

    let mut index = HashMap::with_capacity(ordered.len());
    for link in ordered {
        let owner_key = (link.partition_key.as_str(), link.data.enrollment_id.as_str());
        match index.entry(owner_key) {
            Entry::Vacant(slot) => {
                slot.insert(link);
            }
            Entry::Occupied(owner) => warn!(
                "Enrollment {} is linked more than once by user {}; binding to {} and ignoring {}",
                link.data.enrollment_id,
                link.partition_key,
                owner.get().key(),
                link.key()
            ),
        }
    }
    index
}

/// Pairs accounts with balances by account id. Accounts without a balance
/// are returned separately.
fn pair_accounts(
    accounts: &[ProviderAccount],
    balances: &[ProviderBalance],
) -> (Vec<AccountWithBalance>, Vec<String>) {
    let mut by_account: HashMap<&str, &ProviderBalance> = balances
        .iter()
        .map(|balance| (balance.account_id.as_str(), balance))
        .collect();

    let mut pairs = Vec::with_capacity(accounts.len());
    let mut missing = Vec::new();
    for account in accounts {
        match by_account.remove(account.id.as_str()) {
            Some(balance) => pairs.push(AccountWithBalance {
                details: account.clone(),
                balance: balance.clone(),
            }),
            None => missing.push(account.id.clone()),
        }
    }
    for orphan in by_account.keys() {
        debug!("Dropping balance for unknown account {}", orphan);
    }
    (pairs, missing)
}

#[async_trait]
impl ReconciliationServiceTrait for ReconciliationService {
    async fn reconcile(&self, links: &[AccountLink]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        report.summary.links_processed = links.len();
        if links.is_empty() {
            return report;
        }

        let fetches = join_all(links.iter().map(|link| self.fetch_link(link))).await;
        let owners = enrollment_index(links);

        let mut progress: Vec<LinkProgress> = links.iter().map(|_| LinkProgress::default()).collect();
        let mut scheduled: HashSet<(RecordKey, String)> = HashSet::new();
        let mut units = Vec::new();

        for (origin, (link, fetch)) in links.iter().zip(fetches).enumerate() {
            report.summary.accounts_fetched += fetch.accounts.len();
            progress[origin]
                .errors
                .extend(fetch.failures.iter().map(|f| format!("{}: {}", f.stage, f.message)));
            report.failures.extend(fetch.failures);

            let (pairs, missing) = pair_accounts(&fetch.accounts, &fetch.balances);
            for account_id in missing {
                warn!(
                    "Account {} has no balance this round, not persisting it",
                    account_id
                );
                report.summary.accounts_without_balance += 1;
            }

            for pair in pairs {
                let owner_key = (
                    link.partition_key.as_str(),
                    pair.details.enrollment_id.as_str(),
                );
                let Some(owner) = owners.get(&owner_key).copied() else {
                    let message = format!(
                        "enrollment {} does not belong to any link of this user",
                        pair.details.enrollment_id
                    );
                    warn!("Account {}: {}", pair.details.id, message);
                    report.summary.accounts_unbound += 1;
                    progress[origin].errors.push(message.clone());
                    report.failures.push(
                        ReconcileFailure::new(FailureStage::BindAccount, message)
                            .for_link(&link.partition_key, &link.data.enrollment_id)
                            .for_account(&pair.details.id),
                    );
                    report.accounts.push(pair);
                    continue;
                };

                if !scheduled.insert((owner.key(), pair.details.id.clone())) {
                    debug!(
                        "Account {} already fetched through another link",
                        pair.details.id
                    );
                    continue;
                }
                report.accounts.push(pair.clone());
                units.push(WriteUnit {
                    origin,
                    owner,
                    pair,
                });
            }
        }

        let outcomes = join_all(
            units
                .iter()
                .map(|unit| self.persist_pair(unit.owner, &unit.pair)),
        )
        .await;

        for (unit, outcome) in units.iter().zip(outcomes) {
            match outcome.created {
                Some(true) => report.summary.accounts_created += 1,
                Some(false) => report.summary.accounts_existing += 1,
                None => {}
            }
            if outcome.balance_written {
                report.summary.balances_written += 1;
                progress[unit.origin].accounts_synced += 1;
            }
            if let Some(transactions) = outcome.transactions {
                report.summary.transactions.merge(&transactions);
            }
            progress[unit.origin]
                .errors
                .extend(outcome.failures.iter().map(|f| format!("{}: {}", f.stage, f.message)));
            report.failures.extend(outcome.failures);
        }

        report.summary.links_failed = progress.iter().filter(|p| !p.errors.is_empty()).count();

        let state_writes = join_all(
            links
                .iter()
                .zip(progress.iter())
                .map(|(link, p)| async move { (link, self.record_sync_state(link, p).await) }),
        )
        .await;
        for (link, result) in state_writes {
            if let Err(e) = result {
                error!("Failed to record sync state for {}: {}", link.key(), e);
                report.failures.push(
                    ReconcileFailure::new(FailureStage::WriteSyncState, e.to_string())
                        .for_link(&link.partition_key, &link.data.enrollment_id)
                        .redact(&link.provider_account_id),
                );
            }
        }

        info!(
            "Reconciled {} links: {} accounts fetched, {} created, {} balances written, {} failures",
            report.summary.links_processed,
            report.summary.accounts_fetched,
            report.summary.accounts_created,
            report.summary.balances_written,
            report.failures.len()
        );
        report
    }

    async fn reconcile_all(&self) -> ReconcileReport {
        match self.account_links.get_all_account_links().await {
            Ok(links) => {
                info!("Reconciling {} account links", links.len());
                self.reconcile(&links).await
            }
            Err(e) => {
                error!("Failed to load account links: {}", e);
                ReconcileReport {
                    failures: vec![ReconcileFailure::new(FailureStage::LoadLinks, e.to_string())],
                    ..Default::default()
                }
            }
        }
    }

    async fn reconcile_user(&self, user_id: &str) -> Result<ReconcileReport> {
        let links = self.account_links.get_account_links(user_id).await?;
        debug!("Reconciling {} links for user {}", links.len(), user_id);
        Ok(self.reconcile(&links).await)
    }

    async fn sync_all_transactions(&self) -> TransactionSweepReport {
        let mut report = TransactionSweepReport::default();

        let records = match self.store.scan_by_type(EntityType::Account).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to load accounts for transaction sync: {}", e);
                report
                    .failures
                    .push(ReconcileFailure::new(FailureStage::LoadAccounts, e.to_string()));
                return report;
            }
        };

        let mut accounts = Vec::with_capacity(records.len());
        for record in records {
            let user_id = record.partition_key.clone();
            let credential = record.provider_account_id.clone();
            match AccountRecord::from_record(record) {
                Ok(account) => accounts.push(account),
                Err(e) => {
                    error!("Skipping unreadable account of user {}: {}", user_id, e);
                    report.accounts_failed += 1;
                    report.failures.push(
                        ReconcileFailure::new(FailureStage::LoadAccounts, e.to_string())
                            .for_user(&user_id)
                            .redact(&credential),
                    );
                }
            }
        }

        let results = join_all(
            accounts
                .iter()
                .map(|account| self.transactions.sync_transactions(account)),
        )
        .await;

        for (account, result) in accounts.iter().zip(results) {
            report.accounts_processed += 1;
            match result {
                Ok(summary) => report.transactions.merge(&summary),
                Err(e) => {
                    error!(
                        "Failed to sync transactions for account {}: {}",
                        account.data.id, e
                    );
                    report.accounts_failed += 1;
                    report.failures.push(
                        ReconcileFailure::new(FailureStage::SyncTransactions, e.to_string())
                            .for_link(&account.partition_key, &account.data.enrollment_id)
                            .for_account(&account.data.id)
                            .redact(&account.provider_account_id),
                    );
                }
            }
        }

        info!(
            "Transaction sweep over {} accounts: {} inserted, {} updated, {} accounts failed",
            report.accounts_processed,
            report.transactions.inserted,
            report.transactions.updated,
            report.accounts_failed
        );
        report
    }
}
