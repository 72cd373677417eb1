//! Service wiring: one entity store shared by the engine, the directory and
//! the account service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use pvz_auth::{Hs256Jwt, PasswordHasher};
use pvz_infra::config::AppConfig;
use pvz_infra::{AccountService, Deadline, EntityStore, InMemoryEntityStore, PostgresEntityStore, PvzDirectory, ReceptionEngine};

pub type SharedStore = Arc<dyn EntityStore>;

pub struct AppServices {
    pub engine: ReceptionEngine<SharedStore>,
    pub directory: PvzDirectory<SharedStore>,
    pub accounts: AccountService<SharedStore>,
    pub jwt: Arc<Hs256Jwt>,
    request_timeout: Duration,
}

impl AppServices {
    pub fn new(config: &AppConfig, store: SharedStore) -> Self {
        let jwt = Hs256Jwt::new(
            config.jwt_secret().as_bytes(),
            chrono::Duration::from_std(config.token_ttl()).unwrap_or(chrono::Duration::hours(12)),
        );
        let jwt = Arc::new(jwt);
        Self {
            engine: ReceptionEngine::new(store.clone()),
            directory: PvzDirectory::new(store.clone(), config.page_limits()),
            accounts: AccountService::new(
                store,
                jwt.clone(),
                PasswordHasher::new(config.security.password_cost),
            ),
            jwt,
            request_timeout: config.request_timeout(),
        }
    }

    /// Deadline for the engine/directory/accounts call made on behalf of one request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}

/// Pick the store from config: Postgres when a URL is set, in-memory otherwise.
pub async fn build_store(config: &AppConfig) -> anyhow::Result<SharedStore> {
    match config.database.url.as_deref() {
        Some(url) => {
            let store = PostgresEntityStore::connect(url, config.database.max_connections)
                .await
                .context("failed to connect to postgres")?;
            info!("using postgres entity store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("database.url not set; using in-memory entity store");
            Ok(Arc::new(InMemoryEntityStore::new()))
        }
    }
}
