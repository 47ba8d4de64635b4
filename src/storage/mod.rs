pub mod memory;
pub mod mysql;
pub mod mysql_models;

// MySQL specific modules
mod mysql_account;
mod mysql_session;

// Connection pooling
pub mod pool;

// Key-value session store
#[cfg(feature = "redis-cache")]
pub mod redis_session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result as AppResult, ServerError};
use crate::models::{Account, Session};

use self::memory::MemoryStorage;
use self::mysql::MySqlStorage;
use self::pool::PoolConfig;

/// Storage Result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Error types for storage operations
#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Query timeout: {0}")]
    QueryTimeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) => Self::Database(db_err.to_string()),
            sqlx::Error::Io(io_err) => Self::NetworkError(io_err.to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolExhausted("Connection pool timeout".to_string()),
            sqlx::Error::PoolClosed => Self::Connection("Connection pool closed".to_string()),
            _ => Self::Database(error.to_string()),
        }
    }
}

#[cfg(feature = "redis-cache")]
impl From<redis::RedisError> for StorageError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_timeout() {
            Self::QueryTimeout(error.to_string())
        } else if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
            Self::Connection(error.to_string())
        } else {
            Self::CacheError(error.to_string())
        }
    }
}

/// Credential store: accounts keyed by id with globally unique email
#[async_trait]
pub trait Storage: Send + Sync {
    /// Backend identifier used in logs and health output
    fn storage_type(&self) -> &'static str;

    /// Health check with connection validation
    async fn health_check(&self) -> Result<bool>;

    /// Close all connections gracefully
    async fn close(&self) -> Result<()>;

    /// Insert a new account. Fails with `Duplicate` when the id or the
    /// email is already taken; the check is atomic with the insert.
    async fn create_account(&self, account: &Account) -> Result<()>;
    async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>>;
    /// `email` must already be normalized
    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;
    /// Set both verification flags and bump `updated_at`; `NotFound` if absent
    async fn update_verification_status(
        &self,
        id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()>;
    /// Remove an account together with every session it owns
    async fn delete_account(&self, id: &str) -> Result<()>;
}

/// Server-held session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn store_type(&self) -> &'static str;

    /// Reachability probe for readiness checks
    async fn ping(&self) -> Result<bool>;

    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Returns the stored record even when expired; callers decide validity
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;

    /// Move `expires_at` forward to `expires_at`, never backwards.
    /// Returns false when the session no longer exists.
    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Idempotent
    async fn delete_session(&self, id: &str) -> Result<()>;

    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64>;

    /// Delete every session with `expires_at <= now`; returns the count removed
    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Pair of stores the service runs on
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn Storage>,
    pub sessions: Arc<dyn SessionStore>,
}

/// Builds the stores selected by configuration
pub struct StorageFactory;

impl StorageFactory {
    /// Both stores backed by one in-process map
    pub fn memory() -> Stores {
        let storage = Arc::new(MemoryStorage::new());
        Stores {
            accounts: storage.clone(),
            sessions: storage,
        }
    }

    /// MySQL when `DATABASE_URL` is set, otherwise in-memory. Sessions move to
    /// Redis when the `redis-cache` feature is on and `REDIS_URL` is set.
    pub async fn from_config(config: &Config) -> AppResult<Stores> {
        let Some(url) = config.database.url.as_deref() else {
            warn!("DATABASE_URL not set, using in-memory stores; data is lost on restart");
            return Ok(Self::memory());
        };

        info!(
            "Connecting to MySQL at {}",
            config.database.redacted_url().unwrap_or_default()
        );
        let pool_config = PoolConfig::from(&config.database);
        let storage = Arc::new(MySqlStorage::connect(url, pool_config).await?);
        storage.init_schema().await.map_err(ServerError::from)?;

        let sessions: Arc<dyn SessionStore> = Self::session_store(config, storage.clone()).await?;
        Ok(Stores {
            accounts: storage,
            sessions,
        })
    }

    #[cfg(feature = "redis-cache")]
    async fn session_store(
        config: &Config,
        fallback: Arc<MySqlStorage>,
    ) -> AppResult<Arc<dyn SessionStore>> {
        match config.redis.url.as_deref() {
            Some(url) => {
                let store = redis_session::RedisSessionStore::connect(url).await?;
                info!("Sessions stored in Redis");
                Ok(Arc::new(store))
            }
            None => Ok(fallback),
        }
    }

    #[cfg(not(feature = "redis-cache"))]
    async fn session_store(
        config: &Config,
        fallback: Arc<MySqlStorage>,
    ) -> AppResult<Arc<dyn SessionStore>> {
        if config.redis.url.is_some() {
            warn!("REDIS_URL is set but the redis-cache feature is disabled; sessions stay in MySQL");
        }
        Ok(fallback)
    }
}
