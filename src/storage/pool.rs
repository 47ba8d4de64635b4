//! MySQL connection pool shared by the credential and session tables

use std::time::Duration;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

use crate::config::constants::{DEFAULT_DB_CONN_TIMEOUT_SECS, DEFAULT_DB_POOL};
use crate::config::DatabaseConfig;

const IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_DB_POOL,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(DEFAULT_DB_CONN_TIMEOUT_SECS),
            idle_timeout: IDLE_TIMEOUT,
            max_lifetime: MAX_LIFETIME,
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(db: &DatabaseConfig) -> Self {
        Self {
            max_connections: db.max_connections.max(1),
            acquire_timeout: Duration::from_secs(db.connection_timeout),
            ..Self::default()
        }
    }
}

/// Owns the sqlx pool and the options it was opened with
#[derive(Debug, Clone)]
pub struct PoolManager {
    pool: MySqlPool,
    config: PoolConfig,
}

impl PoolManager {
    pub async fn new(database_url: &str, config: PoolConfig) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool, config })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Waits for checked-out connections to be returned
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_settings_override_pool_defaults() {
        let db = DatabaseConfig {
            url: None,
            max_connections: 0,
            connection_timeout: 3,
        };
        let config = PoolConfig::from(&db);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(3));
        assert_eq!(config.idle_timeout, IDLE_TIMEOUT);
    }
}
