use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, error, warn};

use super::accounts_model::{categorize_accounts, CategorizedAccount, CategorizedAccounts};
use super::accounts_traits::CategorizationServiceTrait;
use crate::account_links::{AccountLink, AccountLinkServiceTrait};
use crate::errors::Result;
use crate::provider::{AccountRecord, BalanceRecord};
use crate::records::{entity_prefix, Entity, EntityPayload};
use crate::store::KeyValueStore;

pub struct CategorizationService {
    store: Arc<dyn KeyValueStore>,
    account_links: Arc<dyn AccountLinkServiceTrait>,
}

impl CategorizationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        account_links: Arc<dyn AccountLinkServiceTrait>,
    ) -> Self {
        Self {
            store,
            account_links,
        }
    }

    async fn load<T: EntityPayload>(&self, link: &AccountLink) -> Result<Vec<Entity<T>>> {
        let prefix = entity_prefix(&link.provider, T::ENTITY_TYPE, &link.provider_account_id);
        let records = self.store.query_by_prefix(&link.partition_key, &prefix).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Entity::<T>::from_record(record) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    error!("Skipping unreadable {} record: {}", T::ENTITY_TYPE, e);
                    None
                }
            })
            .collect())
    }

    /// Joins the link's persisted accounts with their balances.
    async fn load_link_accounts(&self, link: &AccountLink) -> Result<Vec<CategorizedAccount>> {
        let accounts: Vec<AccountRecord> = self.load(link).await?;
        let balances: Vec<BalanceRecord> = self.load(link).await?;

        let mut by_account: HashMap<String, BalanceRecord> = balances
            .into_iter()
            .map(|balance| (balance.data.account_id.clone(), balance))
            .collect();

        Ok(accounts
            .into_iter()
            .filter_map(|account| match by_account.remove(&account.data.id) {
                Some(balance) => Some(CategorizedAccount {
                    details: account.data,
                    balance: balance.data,
                }),
                None => {
                    warn!(
                        "Account {} of user {} has no persisted balance, leaving it out",
                        account.data.id, link.partition_key
                    );
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl CategorizationServiceTrait for CategorizationService {
    async fn get_categorized_accounts(&self, user_id: &str) -> Result<CategorizedAccounts> {
        let links = self.account_links.get_account_links(user_id).await?;
        if links.is_empty() {
            debug!("User {} has no account links", user_id);
            return Ok(CategorizedAccounts::default());
        }

        let per_link = try_join_all(links.iter().map(|link| self.load_link_accounts(link))).await?;
        let joined: Vec<CategorizedAccount> = per_link.into_iter().flatten().collect();
        debug!(
            "Categorizing {} accounts across {} links for user {}",
            joined.len(),
            links.len(),
            user_id
        );
        Ok(categorize_accounts(joined))
    }
}
