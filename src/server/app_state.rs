use std::sync::Arc;

use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;
use crate::services::AuthService;
use crate::storage::{StorageFactory, Stores};

/// Application state that is shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Credential and session lifecycle
    pub auth: Arc<AuthService>,
    /// Stores behind the service, kept for shutdown
    pub stores: Stores,
}

impl AppState {
    /// Wire the service onto already-built stores
    pub fn new(config: Config, stores: Stores) -> Self {
        let auth = AuthService::from_config(&config.auth, stores.clone());
        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            stores,
        }
    }

    /// Build stores from configuration, then the service
    pub async fn from_config(config: Config) -> Result<Self> {
        let stores = StorageFactory::from_config(&config).await?;
        info!(
            "Stores ready: accounts={}, sessions={}",
            stores.accounts.storage_type(),
            stores.sessions.store_type()
        );
        Ok(Self::new(config, stores))
    }

    /// Close store connections
    pub async fn shutdown(&self) {
        if let Err(e) = self.stores.accounts.close().await {
            error!("Error closing storage connections: {}", e);
        }
    }
}
