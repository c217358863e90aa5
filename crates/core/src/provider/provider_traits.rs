use async_trait::async_trait;

use super::provider_model::{ProviderAccount, ProviderBalance, ProviderTransaction};
use crate::errors::Result;

/// Client for an external account-data provider.
///
/// `credential` is the access token stored as the account link's
/// `ProviderAccountID`. Every failure (network, non-success status, malformed
/// payload) surfaces as `Error::UpstreamUnavailable`.
#[async_trait]
pub trait AccountProviderClient: Send + Sync {
    /// Provider name as stored in the `Provider` field of records.
    fn provider_name(&self) -> &str;

    async fn list_accounts(&self, credential: &str) -> Result<Vec<ProviderAccount>>;

    async fn get_balance(&self, credential: &str, account_id: &str) -> Result<ProviderBalance>;

    async fn list_transactions(
        &self,
        credential: &str,
        account_id: &str,
    ) -> Result<Vec<ProviderTransaction>>;
}
