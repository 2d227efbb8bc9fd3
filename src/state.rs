use std::sync::Arc;

use crate::auth::Authenticator;
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};

/// Shared, cheaply clonable handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, auth: Authenticator) -> Self {
        Self {
            config: Arc::new(config),
            store,
            auth,
        }
    }

    /// Build the store and authenticator described by `config`.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match config.database.backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; notes will not survive a restart");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Postgres => {
                let pool = DatabaseManager::connect(&config.database).await?;
                Arc::new(PgStore::new(pool))
            }
        };

        let auth = Authenticator::from_config(&config.security.identity)?;
        Ok(Self::new(config, store, auth))
    }
}
