use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::session::log_prefix;
use crate::models::Session;
use crate::storage::mysql::MySqlStorage;
use crate::storage::mysql_models::SessionRow;
use crate::storage::{Result, StorageError};

/// MySQL session extension trait
pub trait MySqlSessionExt {
    async fn create_session(&self, session: &Session) -> Result<()>;
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;
    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool>;
    async fn delete_session(&self, id: &str) -> Result<()>;
    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64>;
    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}

impl MySqlSessionExt for MySqlStorage {
    async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r"INSERT INTO sessions (id, account_id, expires_at, created_at)
              VALUES (?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.account_id)
        .bind(session.expires_at.timestamp_millis())
        .bind(session.created_at.timestamp_millis())
        .execute(self.get_sqlx_pool())
        .await
        .map_err(StorageError::from)?;

        debug!("Inserted session {}", session.log_id());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r"SELECT id, account_id, expires_at, created_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.get_sqlx_pool())
        .await
        .map_err(StorageError::from)?;

        row.map(Session::try_from).transpose()
    }

    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        // GREATEST keeps concurrent extensions monotonic
        let result = sqlx::query(
            r"UPDATE sessions SET expires_at = GREATEST(expires_at, ?) WHERE id = ?",
        )
        .bind(expires_at.timestamp_millis())
        .bind(id)
        .execute(self.get_sqlx_pool())
        .await
        .map_err(StorageError::from)?;

        // MySQL reports matched-but-unchanged rows as 0 affected
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;
        Ok(exists.is_some())
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;

        debug!("Deleted session {}", log_prefix(id));
        Ok(())
    }

    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = ?")
            .bind(account_id)
            .execute(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }
}
