//! HTTP client for the Teller API.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

use finlink_core::errors::{Error, Result};
use finlink_core::provider::{
    AccountProviderClient, ProviderAccount, ProviderBalance, ProviderTransaction,
};

use crate::certificates::CertificateCache;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Production base URL of the Teller API.
pub const DEFAULT_TELLER_API_URL: &str = "https://api.teller.io";

/// Value stored in the `Provider` field of records fetched through Teller.
pub const PROVIDER_NAME: &str = "Teller";

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TellerConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TellerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TELLER_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Teller implementation of [`AccountProviderClient`].
///
/// ```ignore
/// let certificates = CertificateCache::new(credentials, "teller-cert", "teller-key", timeout);
/// let client = TellerClient::new(TellerConfig::default(), certificates);
/// let accounts = client.list_accounts(&access_token).await?;
/// ```
pub struct TellerClient {
    base_url: String,
    certificates: CertificateCache,
}

impl TellerClient {
    pub fn new(config: TellerConfig, certificates: CertificateCache) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            certificates,
        }
    }

    pub fn certificates(&self) -> &CertificateCache {
        &self.certificates
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Builds `<base_url>/<segments..>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::Unexpected(format!("Invalid Teller base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::Unexpected(format!("Teller base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated GET request and parse the response.
    async fn get<T: DeserializeOwned>(&self, access_token: &str, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        debug!("[Teller] GET {}", url);

        let client = self.certificates.client().await?;
        let response = client
            .get(url)
            .headers(self.headers())
            .basic_auth(access_token, Some(""))
            .send()
            .await
            .map_err(|e| {
                // A refused handshake may mean rotated certificates.
                if e.is_connect() && self.certificates.uses_client_identity() {
                    warn!("[Teller] Connection for {} failed, reloading certificates", path);
                    self.certificates.invalidate();
                }
                Error::UpstreamUnavailable(format!("Request to {} failed: {}", path, e.without_url()))
            })?;

        self.parse_response(&path, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::UpstreamUnavailable(format!("Failed to read response of {}: {}", path, e))
        })?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                let msg = err
                    .error
                    .message
                    .or(err.error.code)
                    .unwrap_or_else(|| format!("HTTP {}", status));
                return Err(Error::UpstreamUnavailable(format!(
                    "Teller API error {} on {}: {}",
                    status.as_u16(),
                    path,
                    msg
                )));
            }
            return Err(Error::UpstreamUnavailable(format!(
                "Teller API error {} on {}: {}",
                status.as_u16(),
                path,
                body.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::UpstreamUnavailable(format!("Malformed response from {}: {}", path, e))
        })
    }
}

/// Ids that would vanish or climb when used as a path segment are refused.
fn path_id(id: &str) -> Result<&str> {
    match id {
        "" | "." | ".." => Err(Error::UpstreamUnavailable(format!(
            "Invalid account id '{}'",
            id
        ))),
        _ => Ok(id),
    }
}

#[async_trait]
impl AccountProviderClient for TellerClient {
    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn list_accounts(&self, credential: &str) -> Result<Vec<ProviderAccount>> {
        self.get(credential, &["accounts"]).await
    }

    async fn get_balance(&self, credential: &str, account_id: &str) -> Result<ProviderBalance> {
        self.get(credential, &["accounts", path_id(account_id)?, "balances"])
            .await
    }

    async fn list_transactions(
        &self,
        credential: &str,
        account_id: &str,
    ) -> Result<Vec<ProviderTransaction>> {
        self.get(credential, &["accounts", path_id(account_id)?, "transactions"])
            .await
    }
}
