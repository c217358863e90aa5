//! Shared fakes and fixtures for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::{Error, Result, StoreError};
use crate::provider::{
    AccountProviderClient, Institution, ProviderAccount, ProviderBalance, ProviderTransaction,
    TransactionDetails,
};
use crate::records::{EntityType, FieldDelta, Record};
use crate::store::{KeyValueStore, MemoryStore, PutOutcome};

pub const PROVIDER: &str = "Teller";

pub fn account(id: &str, enrollment_id: &str, subtype: &str) -> ProviderAccount {
    let account_type = if subtype == "credit_card" {
        "credit"
    } else {
        "depository"
    };
    ProviderAccount {
        id: id.to_string(),
        enrollment_id: enrollment_id.to_string(),
        institution: Institution {
            id: "bank".to_string(),
            name: "Bank".to_string(),
        },
        name: format!("Account {}", id),
        account_type: account_type.to_string(),
        subtype: subtype.to_string(),
        currency: "USD".to_string(),
        last_four: Some("1234".to_string()),
        status: "open".to_string(),
    }
}

pub fn balance(account_id: &str, ledger: &str, available: &str) -> ProviderBalance {
    ProviderBalance {
        account_id: account_id.to_string(),
        ledger: Some(ledger.to_string()),
        available: Some(available.to_string()),
    }
}

pub fn transaction(id: &str, account_id: &str, amount: &str, status: &str) -> ProviderTransaction {
    ProviderTransaction {
        id: id.to_string(),
        account_id: account_id.to_string(),
        amount: amount.to_string(),
        date: "2024-03-01".to_string(),
        description: format!("Transaction {}", id),
        status: status.to_string(),
        transaction_type: "card_payment".to_string(),
        running_balance: None,
        details: TransactionDetails {
            processing_status: if status == "pending" {
                "pending".to_string()
            } else {
                "complete".to_string()
            },
            category: Some("general".to_string()),
            counterparty: None,
        },
    }
}

#[derive(Default)]
pub struct MockProviderState {
    /// Accounts returned per access credential.
    pub accounts: HashMap<String, Vec<ProviderAccount>>,
    /// Balances per account id.
    pub balances: HashMap<String, ProviderBalance>,
    /// Transactions per account id.
    pub transactions: HashMap<String, Vec<ProviderTransaction>>,
    pub failing_credentials: HashSet<String>,
    pub failing_balances: HashSet<String>,
    /// Balance calls for these account ids never complete.
    pub hanging_balances: HashSet<String>,
    pub calls: Vec<String>,
}

#[derive(Default, Clone)]
pub struct MockProviderClient {
    pub state: Arc<Mutex<MockProviderState>>,
}

impl MockProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(&self, credential: &str, accounts: Vec<ProviderAccount>) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(credential.to_string(), accounts);
    }

    pub fn with_balance(&self, balance: ProviderBalance) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(balance.account_id.clone(), balance);
    }

    pub fn with_transactions(&self, account_id: &str, transactions: Vec<ProviderTransaction>) {
        self.state
            .lock()
            .unwrap()
            .transactions
            .insert(account_id.to_string(), transactions);
    }

    pub fn fail_credential(&self, credential: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_credentials
            .insert(credential.to_string());
    }

    pub fn fail_balance(&self, account_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_balances
            .insert(account_id.to_string());
    }

    pub fn hang_balance(&self, account_id: &str) {
        self.state
            .lock()
            .unwrap()
            .hanging_balances
            .insert(account_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl AccountProviderClient for MockProviderClient {
    fn provider_name(&self) -> &str {
        PROVIDER
    }

    async fn list_accounts(&self, credential: &str) -> Result<Vec<ProviderAccount>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list_accounts:{}", credential));
        if state.failing_credentials.contains(credential) {
            return Err(Error::UpstreamUnavailable(format!(
                "GET /accounts failed for {}",
                credential
            )));
        }
        Ok(state.accounts.get(credential).cloned().unwrap_or_default())
    }

    async fn get_balance(&self, credential: &str, account_id: &str) -> Result<ProviderBalance> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("get_balance:{}:{}", credential, account_id));
            if state.failing_balances.contains(account_id) {
                return Err(Error::UpstreamUnavailable(format!(
                    "GET /accounts/{}/balances returned 502",
                    account_id
                )));
            }
            state.hanging_balances.contains(account_id)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        state
            .balances
            .get(account_id)
            .cloned()
            .ok_or_else(|| Error::UpstreamUnavailable(format!("No balance for {}", account_id)))
    }

    async fn list_transactions(
        &self,
        credential: &str,
        account_id: &str,
    ) -> Result<Vec<ProviderTransaction>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("list_transactions:{}:{}", credential, account_id));
        Ok(state
            .transactions
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A store call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    PutIfAbsent(String, PutOutcome),
    Put(String),
    Update(String, Vec<FieldDelta>),
}

/// Memory store that records writes and can be told to fail some of them.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<StoreCall>>,
    /// Writes whose sort key contains one of these fragments fail.
    failing_writes: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_containing(&self, fragment: &str) {
        self.failing_writes.lock().unwrap().push(fragment.to_string());
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub async fn records_of(&self, entity_type: EntityType) -> Vec<Record> {
        self.inner.scan_by_type(entity_type).await.unwrap()
    }

    fn check_write(&self, sort_key: &str) -> Result<()> {
        let failing = self.failing_writes.lock().unwrap();
        if failing.iter().any(|fragment| sort_key.contains(fragment.as_str())) {
            return Err(StoreError::Unavailable(format!("write rejected for {}", sort_key)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
        self.inner.get(partition_key, sort_key).await
    }

    async fn put_if_absent(&self, record: Record) -> Result<PutOutcome> {
        self.check_write(&record.sort_key)?;
        let sort_key = record.sort_key.clone();
        let outcome = self.inner.put_if_absent(record).await?;
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::PutIfAbsent(sort_key, outcome));
        Ok(outcome)
    }

    async fn put(&self, record: Record) -> Result<()> {
        self.check_write(&record.sort_key)?;
        let sort_key = record.sort_key.clone();
        self.inner.put(record).await?;
        self.calls.lock().unwrap().push(StoreCall::Put(sort_key));
        Ok(())
    }

    async fn update_fields(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Vec<FieldDelta>,
    ) -> Result<()> {
        self.check_write(sort_key)?;
        self.inner
            .update_fields(partition_key, sort_key, deltas.clone())
            .await?;
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Update(sort_key.to_string(), deltas));
        Ok(())
    }

    async fn query_by_prefix(
        &self,
        partition_key: &str,
        sort_key_prefix: &str,
    ) -> Result<Vec<Record>> {
        self.inner.query_by_prefix(partition_key, sort_key_prefix).await
    }

    async fn scan_by_type(&self, entity_type: EntityType) -> Result<Vec<Record>> {
        self.inner.scan_by_type(entity_type).await
    }
}
