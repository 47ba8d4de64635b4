use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::models::{Account, Session};
use crate::storage::mysql_account::MySqlAccountExt;
use crate::storage::mysql_session::MySqlSessionExt;
use crate::storage::pool::{PoolConfig, PoolManager};
use crate::storage::{Result, SessionStore, Storage, StorageError};

const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id VARCHAR(64) NOT NULL PRIMARY KEY,
    email VARCHAR(254) NOT NULL,
    password_digest VARCHAR(255) NOT NULL,
    name VARCHAR(255) NOT NULL DEFAULT '',
    phone_number VARCHAR(32) NOT NULL DEFAULT '',
    role VARCHAR(16) NOT NULL,
    mfa_secret VARCHAR(255) NULL,
    email_verified BOOLEAN NOT NULL DEFAULT FALSE,
    phone_verified BOOLEAN NOT NULL DEFAULT FALSE,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    UNIQUE KEY uq_accounts_email (email)
) DEFAULT CHARSET=utf8mb4";

const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id VARCHAR(128) NOT NULL PRIMARY KEY,
    account_id VARCHAR(64) NOT NULL,
    expires_at BIGINT NOT NULL,
    created_at BIGINT NOT NULL,
    INDEX idx_sessions_account (account_id),
    INDEX idx_sessions_expires (expires_at),
    CONSTRAINT fk_sessions_account FOREIGN KEY (account_id)
        REFERENCES accounts(id) ON DELETE CASCADE
) DEFAULT CHARSET=utf8mb4";

/// MySQL storage implementation of both the credential and session stores
pub struct MySqlStorage {
    pool: PoolManager,
}

impl MySqlStorage {
    /// Connect a pool to `url`
    pub async fn connect(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = PoolManager::new(url, config)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect via sqlx: {}", e)))?;
        debug!(
            "MySQL pool ready (max_connections={})",
            pool.config().max_connections
        );
        Ok(Self { pool })
    }

    pub fn get_sqlx_pool(&self) -> &MySqlPool {
        self.pool.pool()
    }

    /// Create tables when missing
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");

        sqlx::query(CREATE_ACCOUNTS_TABLE)
            .execute(self.get_sqlx_pool())
            .await
            .map_err(|e| StorageError::Database(format!("Failed to create accounts table: {}", e)))?;

        sqlx::query(CREATE_SESSIONS_TABLE)
            .execute(self.get_sqlx_pool())
            .await
            .map_err(|e| StorageError::Database(format!("Failed to create sessions table: {}", e)))?;

        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl Storage for MySqlStorage {
    fn storage_type(&self) -> &'static str {
        "mysql"
    }

    async fn health_check(&self) -> Result<bool> {
        if self.pool.is_closed() {
            return Ok(false);
        }
        sqlx::query("SELECT 1")
            .execute(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        info!("Closing MySQL connection pool");
        self.pool.close().await;
        Ok(())
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        MySqlAccountExt::create_account(self, account).await
    }

    async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>> {
        MySqlAccountExt::get_account_by_id(self, id).await
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        MySqlAccountExt::get_account_by_email(self, email).await
    }

    async fn update_verification_status(
        &self,
        id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()> {
        MySqlAccountExt::update_verification_status(self, id, email_verified, phone_verified).await
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        MySqlAccountExt::delete_account(self, id).await
    }
}

#[async_trait]
impl SessionStore for MySqlStorage {
    fn store_type(&self) -> &'static str {
        "mysql"
    }

    async fn ping(&self) -> Result<bool> {
        Storage::health_check(self).await
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        MySqlSessionExt::create_session(self, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        MySqlSessionExt::get_session(self, id).await
    }

    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        MySqlSessionExt::extend_session(self, id, expires_at).await
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        MySqlSessionExt::delete_session(self, id).await
    }

    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64> {
        MySqlSessionExt::delete_sessions_for_account(self, account_id).await
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        MySqlSessionExt::cleanup_expired_sessions(self, now).await
    }
}
