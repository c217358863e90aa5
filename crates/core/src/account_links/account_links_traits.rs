use async_trait::async_trait;

use super::account_links_model::{AccountLink, NewAccountLink};
use crate::errors::Result;

/// Trait defining the contract for the account link registry.
#[async_trait]
pub trait AccountLinkServiceTrait: Send + Sync {
    /// Validates and persists a link for `user_id`.
    ///
    /// Linking a credential that is already linked returns the stored link unchanged.
    async fn create_account_link(&self, request: NewAccountLink, user_id: &str)
        -> Result<AccountLink>;

    /// Links owned by one user.
    async fn get_account_links(&self, user_id: &str) -> Result<Vec<AccountLink>>;

    /// Links of every user, for the scheduled sweep.
    async fn get_all_account_links(&self) -> Result<Vec<AccountLink>>;
}
