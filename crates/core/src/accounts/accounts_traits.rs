use async_trait::async_trait;

use super::accounts_model::CategorizedAccounts;
use crate::errors::Result;

#[async_trait]
pub trait CategorizationServiceTrait: Send + Sync {
    /// Builds the categorized view of a user's persisted accounts.
    ///
    /// A user without links gets two empty buckets.
    async fn get_categorized_accounts(&self, user_id: &str) -> Result<CategorizedAccounts>;
}
