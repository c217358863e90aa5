use std::collections::HashSet;
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use finlink_core::{
    account_links::{AccountLinkService, AccountLinkServiceTrait},
    accounts::{CategorizationService, CategorizationServiceTrait},
    identity::IdentityProvider,
    provider::AccountProviderClient,
    reconciliation::{ReconcileConfig, ReconciliationService, ReconciliationServiceTrait},
    store::{KeyValueStore, MemoryStore},
    transactions::{TransactionSyncService, TransactionSyncServiceTrait},
};
use finlink_storage_sqlite::{db, SqliteStore};
use finlink_teller::{CertificateCache, TellerClient, TellerConfig};

use crate::{auth::JwtIdentityProvider, config::Config, credentials::FileCredentialProvider};

pub struct AppState {
    pub account_link_service: Arc<dyn AccountLinkServiceTrait>,
    pub categorization_service: Arc<dyn CategorizationServiceTrait>,
    pub transaction_service: Arc<dyn TransactionSyncServiceTrait>,
    pub reconciliation_service: Arc<dyn ReconciliationServiceTrait>,
    /// `None` when no token secret is configured; user routes then answer 401.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// Subjects allowed to run cross-user tasks.
    pub operators: HashSet<String>,
}

impl AppState {
    /// Wires the services over a store and a provider client.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AccountProviderClient>,
        identity: Option<Arc<dyn IdentityProvider>>,
        reconcile_config: ReconcileConfig,
    ) -> Self {
        let account_link_service = Arc::new(AccountLinkService::new(store.clone()));
        let categorization_service = Arc::new(CategorizationService::new(
            store.clone(),
            account_link_service.clone(),
        ));
        let transaction_service = Arc::new(TransactionSyncService::new(
            store.clone(),
            provider.clone(),
            reconcile_config.call_timeout,
        ));
        let reconciliation_service = Arc::new(ReconciliationService::new(
            store,
            provider,
            account_link_service.clone(),
            transaction_service.clone(),
            reconcile_config,
        ));

        Self {
            account_link_service,
            categorization_service,
            transaction_service,
            reconciliation_service,
            identity,
            operators: HashSet::new(),
        }
    }

    pub fn with_operators(mut self, operators: impl IntoIterator<Item = String>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("FL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }

    db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", config.db_path);
    let pool = db::create_pool(&config.db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer(pool.clone());
    Ok(Arc::new(SqliteStore::new(pool, writer)))
}

fn build_provider(config: &Config) -> Arc<TellerClient> {
    let certificates = match &config.client_identity {
        Some(identity) => {
            tracing::info!(
                "Provider calls use client certificate '{}'",
                identity.certificate_name
            );
            CertificateCache::new(
                Arc::new(FileCredentialProvider::new(config.credentials_dir.clone())),
                identity.certificate_name.clone(),
                identity.private_key_name.clone(),
                config.provider_timeout,
            )
        }
        None => {
            tracing::warn!("No client certificate configured; provider calls use plain TLS");
            CertificateCache::without_identity(config.provider_timeout)
        }
    };

    Arc::new(TellerClient::new(
        TellerConfig {
            base_url: config.provider_base_url.clone(),
            timeout: config.provider_timeout,
        },
        certificates,
    ))
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = build_store(config)?;

    let teller = build_provider(config);
    // Load certificates before serving; a failure is retried on the first provider call.
    if let Err(e) = teller.certificates().client().await {
        tracing::warn!("Provider client is not ready: {}", e);
    }
    let provider: Arc<dyn AccountProviderClient> = teller;

    let identity: Option<Arc<dyn IdentityProvider>> = match &config.jwt {
        Some(jwt) => Some(Arc::new(JwtIdentityProvider::new(jwt))),
        None => {
            tracing::warn!("FL_JWT_SECRET is not set; user routes will reject every request");
            None
        }
    };
    if config.operators.is_empty() {
        tracing::info!("FL_OPERATOR_SUBJECTS is not set; task routes are unavailable");
    }

    let reconcile_config = ReconcileConfig {
        call_timeout: config.provider_timeout,
    };

    let state = AppState::new(store, provider, identity, reconcile_config)
        .with_operators(config.operators.iter().cloned());
    Ok(Arc::new(state))
}
