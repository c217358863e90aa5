use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info};

use finlink_core::errors::{Error, Result};
use finlink_core::secrets::CredentialProvider;

/// Names of the client certificate and private key in the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentityNames {
    pub certificate: String,
    pub private_key: String,
}

/// Owns the HTTP client used for provider calls.
///
/// The client certificate and key are fetched from the credential provider on
/// first use and the resulting client is kept until [`invalidate`] is called.
/// Without identity names the client connects without a client certificate.
///
/// [`invalidate`]: CertificateCache::invalidate
pub struct CertificateCache {
    credentials: Option<Arc<dyn CredentialProvider>>,
    identity: Option<ClientIdentityNames>,
    timeout: Duration,
    client: RwLock<Option<reqwest::Client>>,
}

impl CertificateCache {
    /// Cache that loads a client identity for mutual TLS.
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        certificate_name: impl Into<String>,
        private_key_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            credentials: Some(credentials),
            identity: Some(ClientIdentityNames {
                certificate: certificate_name.into(),
                private_key: private_key_name.into(),
            }),
            timeout,
            client: RwLock::new(None),
        }
    }

    /// Cache for a plain TLS client, e.g. the Teller sandbox or local testing.
    pub fn without_identity(timeout: Duration) -> Self {
        Self {
            credentials: None,
            identity: None,
            timeout,
            client: RwLock::new(None),
        }
    }

    pub fn uses_client_identity(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns the cached client, building it on first use.
    ///
    /// Credential reads run on the blocking thread pool.
    pub async fn client(&self) -> Result<reqwest::Client> {
        if let Some(client) = self.cached()? {
            return Ok(client);
        }

        let pem = self.read_identity().await?;
        let mut slot = self
            .client
            .write()
            .map_err(|_| Error::Unexpected("Certificate cache lock poisoned".to_string()))?;
        // Another caller may have filled the slot while we were loading.
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = self.build_client(pem.as_deref())?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drops the cached client so the next call reloads the credentials.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.client.write() {
            if slot.take().is_some() {
                info!("Provider client certificates invalidated");
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.read_slot().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn read_slot(&self) -> Result<std::sync::RwLockReadGuard<'_, Option<reqwest::Client>>> {
        self.client
            .read()
            .map_err(|_| Error::Unexpected("Certificate cache lock poisoned".to_string()))
    }

    fn cached(&self) -> Result<Option<reqwest::Client>> {
        Ok(self.read_slot()?.as_ref().cloned())
    }

    /// Reads the certificate and key, concatenated as one PEM bundle.
    async fn read_identity(&self) -> Result<Option<Vec<u8>>> {
        let (Some(credentials), Some(names)) = (&self.credentials, &self.identity) else {
            return Ok(None);
        };
        debug!(
            "Loading client certificate '{}' and key '{}'",
            names.certificate, names.private_key
        );
        let credentials = Arc::clone(credentials);
        let names = names.clone();

        let pem = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let mut pem = credentials.get_credential(&names.certificate)?;
            pem.push(b'\n');
            pem.extend(credentials.get_credential(&names.private_key)?);
            Ok(pem)
        })
        .await
        .map_err(|e| Error::Unexpected(format!("Credential loading task failed: {}", e)))??;
        Ok(Some(pem))
    }

    fn build_client(&self, identity_pem: Option<&[u8]>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.timeout);

        if let Some(pem) = identity_pem {
            let identity = reqwest::Identity::from_pem(pem).map_err(|e| {
                Error::Credential(format!("Invalid client certificate or key: {}", e))
            })?;
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))
    }
}
