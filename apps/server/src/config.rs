use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;

/// `FL_DB_PATH` value that selects the in-memory store.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Names of the client certificate and key in the credentials directory.
#[derive(Debug, Clone)]
pub struct ClientIdentityConfig {
    pub certificate_name: String,
    pub private_key_name: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Vec<u8>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub request_timeout: Duration,
    pub provider_base_url: String,
    pub provider_timeout: Duration,
    pub credentials_dir: PathBuf,
    /// Mutual TLS towards the provider, enabled only when both names are set.
    pub client_identity: Option<ClientIdentityConfig>,
    /// User routes answer 401 while this is unset.
    pub jwt: Option<JwtConfig>,
    /// Token subjects allowed to run the cross-user tasks.
    pub operators: Vec<String>,
    /// Zero disables the background scheduler.
    pub sync_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = env_or("FL_LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .context("Invalid FL_LISTEN_ADDR")?;
        let db_path = env_or("FL_DB_PATH", "./db/finlink.db");
        let timeout_ms: u64 = env_or("FL_REQUEST_TIMEOUT_MS", "30000")
            .parse()
            .unwrap_or(30000);
        let provider_base_url = env_or(
            "FL_PROVIDER_BASE_URL",
            finlink_teller::DEFAULT_TELLER_API_URL,
        );
        let provider_timeout_secs: u64 = env_or("FL_PROVIDER_TIMEOUT_SECS", "30")
            .parse()
            .unwrap_or(30);
        let credentials_dir = PathBuf::from(env_or("FL_CREDENTIALS_DIR", "./credentials"));

        let client_identity = match (
            env_opt("FL_CERT_SECRET_NAME"),
            env_opt("FL_PK_SECRET_NAME"),
        ) {
            (Some(certificate_name), Some(private_key_name)) => Some(ClientIdentityConfig {
                certificate_name,
                private_key_name,
            }),
            (None, None) => None,
            _ => anyhow::bail!("FL_CERT_SECRET_NAME and FL_PK_SECRET_NAME must be set together"),
        };

        let jwt = env_opt("FL_JWT_SECRET").map(|secret| JwtConfig {
            secret: secret.into_bytes(),
            issuer: env_opt("FL_JWT_ISSUER"),
            audience: env_opt("FL_JWT_AUDIENCE"),
        });

        let operators: Vec<String> = env_opt("FL_OPERATOR_SUBJECTS")
            .map(|subjects| {
                subjects
                    .split(',')
                    .map(str::trim)
                    .filter(|subject| !subject.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let sync_interval_secs: u64 = env_or("FL_SYNC_INTERVAL_SECS", "14400")
            .parse()
            .context("Invalid FL_SYNC_INTERVAL_SECS")?;

        Ok(Self {
            listen_addr,
            db_path,
            request_timeout: Duration::from_millis(timeout_ms),
            provider_base_url,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            credentials_dir,
            client_identity,
            jwt,
            operators,
            sync_interval: Duration::from_secs(sync_interval_secs),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.db_path == IN_MEMORY_DB
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values both count as absent.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
