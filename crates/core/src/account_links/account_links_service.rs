use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info};

use super::account_links_model::{AccountLink, NewAccountLink};
use super::account_links_traits::AccountLinkServiceTrait;
use crate::errors::{Result, StoreError};
use crate::records::{EntityType, Record, SORT_KEY_ROOT};
use crate::store::{KeyValueStore, PutOutcome};

pub struct AccountLinkService {
    store: Arc<dyn KeyValueStore>,
}

impl AccountLinkService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

/// Decodes link records, skipping those that fail schema validation.
fn decode_links(records: Vec<Record>) -> Vec<AccountLink> {
    records
        .into_iter()
        .filter(|record| record.entity_type == EntityType::AccountLink)
        .filter_map(|record| match AccountLink::from_record(record) {
            Ok(link) => Some(link),
            Err(e) => {
                error!("Skipping unreadable account link: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl AccountLinkServiceTrait for AccountLinkService {
    async fn create_account_link(
        &self,
        request: NewAccountLink,
        user_id: &str,
    ) -> Result<AccountLink> {
        request.validate()?;
        let link = request.into_account_link(user_id);
        debug!(
            "Linking {} enrollment {} for user {}",
            link.provider, link.data.enrollment_id, user_id
        );

        match self.store.put_if_absent(link.to_record()?).await? {
            PutOutcome::Created => {
                info!(
                    "Created account link {} for user {}",
                    link.data.enrollment_id, user_id
                );
                Ok(link)
            }
            PutOutcome::AlreadyExists => {
                let key = link.key();
                info!("Account link already exists: {}", key);
                let existing = self
                    .store
                    .get(&key.partition_key, &key.sort_key)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
                AccountLink::from_record(existing)
            }
        }
    }

    async fn get_account_links(&self, user_id: &str) -> Result<Vec<AccountLink>> {
        let records = self.store.query_by_prefix(user_id, SORT_KEY_ROOT).await?;
        Ok(decode_links(records))
    }

    async fn get_all_account_links(&self) -> Result<Vec<AccountLink>> {
        let records = self.store.scan_by_type(EntityType::AccountLink).await?;
        let mut links = decode_links(records);
        links.sort_by_key(|link| link.key());
        Ok(links)
    }
}
