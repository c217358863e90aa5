//! Links, reconciles and categorizes through the public API only.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use finlink_core::account_links::{AccountLinkService, AccountLinkServiceTrait, NewAccountLink};
use finlink_core::accounts::{CategorizationService, CategorizationServiceTrait};
use finlink_core::errors::{Error, Result};
use finlink_core::provider::{
    AccountProviderClient, Institution, ProviderAccount, ProviderBalance, ProviderTransaction,
};
use finlink_core::reconciliation::{
    FailureStage, ReconcileConfig, ReconciliationService, ReconciliationServiceTrait,
};
use finlink_core::records::EntityType;
use finlink_core::store::{KeyValueStore, MemoryStore};
use finlink_core::transactions::TransactionSyncService;

/// Accounts per credential; balance calls for `failing_credential` fail.
#[derive(Default)]
struct FakeProvider {
    accounts: HashMap<String, Vec<ProviderAccount>>,
    balances: HashMap<String, (&'static str, &'static str)>,
    failing_credential: Mutex<Option<String>>,
}

#[async_trait]
impl AccountProviderClient for FakeProvider {
    fn provider_name(&self) -> &str {
        "Teller"
    }

    async fn list_accounts(&self, credential: &str) -> Result<Vec<ProviderAccount>> {
        Ok(self.accounts.get(credential).cloned().unwrap_or_default())
    }

    async fn get_balance(&self, credential: &str, account_id: &str) -> Result<ProviderBalance> {
        if self.failing_credential.lock().unwrap().as_deref() == Some(credential) {
            return Err(Error::UpstreamUnavailable("503 Service Unavailable".to_string()));
        }
        let (ledger, available) = self.balances[account_id];
        Ok(ProviderBalance {
            account_id: account_id.to_string(),
            ledger: Some(ledger.to_string()),
            available: Some(available.to_string()),
        })
    }

    async fn list_transactions(
        &self,
        _credential: &str,
        _account_id: &str,
    ) -> Result<Vec<ProviderTransaction>> {
        Ok(Vec::new())
    }
}

fn account(id: &str, enrollment_id: &str, subtype: &str) -> ProviderAccount {
    ProviderAccount {
        id: id.to_string(),
        enrollment_id: enrollment_id.to_string(),
        institution: Institution {
            id: "bank".to_string(),
            name: "Bank".to_string(),
        },
        name: format!("Account {}", id),
        account_type: "depository".to_string(),
        subtype: subtype.to_string(),
        currency: "USD".to_string(),
        last_four: None,
        status: "open".to_string(),
    }
}

fn link_request(credential: &str, enrollment_id: &str) -> NewAccountLink {
    let mut entity_data = BTreeMap::new();
    entity_data.insert("enrollment_id".to_string(), enrollment_id.to_string());
    NewAccountLink {
        provider: "Teller".to_string(),
        provider_id: credential.to_string(),
        entity_data,
        metadata: None,
    }
}

struct Services {
    store: Arc<MemoryStore>,
    provider: Arc<FakeProvider>,
    links: Arc<AccountLinkService>,
    reconciliation: ReconciliationService,
    categorization: CategorizationService,
}

fn services(provider: FakeProvider) -> Services {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(provider);
    let config = ReconcileConfig {
        call_timeout: Duration::from_secs(2),
    };
    let links = Arc::new(AccountLinkService::new(store.clone()));
    let transactions = Arc::new(TransactionSyncService::new(
        store.clone(),
        provider.clone(),
        config.call_timeout,
    ));
    Services {
        reconciliation: ReconciliationService::new(
            store.clone(),
            provider.clone(),
            links.clone(),
            transactions,
            config,
        ),
        categorization: CategorizationService::new(store.clone(), links.clone()),
        store,
        provider,
        links,
    }
}

#[tokio::test]
async fn reconciled_accounts_show_up_categorized() {
    let mut provider = FakeProvider::default();
    provider.accounts.insert(
        "tok_1".to_string(),
        vec![
            account("chk", "enr_1", "checking"),
            account("cc", "enr_1", "credit_card"),
            account("odd", "enr_1", "brokerage"),
        ],
    );
    provider.balances.insert("chk".to_string(), ("100.0", "90.0"));
    provider.balances.insert("cc".to_string(), ("50.0", "10.0"));
    provider.balances.insert("odd".to_string(), ("1000.0", "1000.0"));
    let s = services(provider);

    s.links
        .create_account_link(link_request("tok_1", "enr_1"), "user-1")
        .await
        .unwrap();

    let report = s.reconciliation.reconcile_all().await;
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.summary.accounts_created, 3);

    let view = s.categorization.get_categorized_accounts("user-1").await.unwrap();
    assert_eq!(view.debit.accounts.len(), 1);
    assert_eq!(view.credit.accounts.len(), 1);
    assert_eq!(view.debit.total_ledger, dec!(100.0));
    assert_eq!(view.credit.total_ledger, dec!(-50.0));
    assert_eq!(view.net_worth, dec!(50.0));

    // A second pass writes no new accounts.
    let again = s.reconciliation.reconcile_all().await;
    assert_eq!(again.summary.accounts_created, 0);
    assert_eq!(again.summary.accounts_existing, 3);
    assert_eq!(
        s.store.scan_by_type(EntityType::Account).await.unwrap().len(),
        3
    );
    assert_eq!(
        s.store.scan_by_type(EntityType::Balance).await.unwrap().len(),
        3
    );
}

#[tokio::test]
async fn failing_link_does_not_block_other_links() {
    let mut provider = FakeProvider::default();
    provider
        .accounts
        .insert("tok_a".to_string(), vec![account("a1", "enr_a", "savings")]);
    provider
        .accounts
        .insert("tok_b".to_string(), vec![account("b1", "enr_b", "checking")]);
    provider.balances.insert("a1".to_string(), ("10.00", "10.00"));
    provider.balances.insert("b1".to_string(), ("20.00", "20.00"));
    *provider.failing_credential.lock().unwrap() = Some("tok_a".to_string());
    let s = services(provider);

    s.links
        .create_account_link(link_request("tok_a", "enr_a"), "user-a")
        .await
        .unwrap();
    s.links
        .create_account_link(link_request("tok_b", "enr_b"), "user-b")
        .await
        .unwrap();

    let report = s.reconciliation.reconcile_all().await;
    assert_eq!(report.summary.accounts_created, 1);
    assert!(report
        .failures
        .iter()
        .any(|f| f.stage == FailureStage::FetchBalance && f.user_id.as_deref() == Some("user-a")));

    let b = s.categorization.get_categorized_accounts("user-b").await.unwrap();
    assert_eq!(b.net_worth, dec!(20.00));
    let a = s.categorization.get_categorized_accounts("user-a").await.unwrap();
    assert!(a.debit.accounts.is_empty());

    // The next pass picks the recovered link up.
    *s.provider.failing_credential.lock().unwrap() = None;
    let report = s.reconciliation.reconcile_all().await;
    assert!(report.failures.is_empty());
    let a = s.categorization.get_categorized_accounts("user-a").await.unwrap();
    assert_eq!(a.net_worth, dec!(10.00));
}

#[tokio::test]
async fn user_without_links_gets_empty_buckets() {
    let s = services(FakeProvider::default());
    let view = s.categorization.get_categorized_accounts("nobody").await.unwrap();
    assert!(view.debit.accounts.is_empty());
    assert!(view.credit.accounts.is_empty());
    assert_eq!(view.net_worth, dec!(0));
}
