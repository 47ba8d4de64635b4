use chrono::Utc;
use tracing::debug;

use crate::models::Account;
use crate::storage::mysql::MySqlStorage;
use crate::storage::mysql_models::AccountRow;
use crate::storage::{Result, StorageError};

const SELECT_ACCOUNT: &str = r"SELECT
    id, email, password_digest, name, phone_number, role, mfa_secret,
    email_verified, phone_verified, created_at, updated_at
  FROM accounts";

/// MySQL account extension trait
pub trait MySqlAccountExt {
    async fn create_account(&self, account: &Account) -> Result<()>;
    async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>>;
    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn update_verification_status(
        &self,
        id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()>;
    async fn delete_account(&self, id: &str) -> Result<()>;
}

impl MySqlAccountExt for MySqlStorage {
    async fn create_account(&self, account: &Account) -> Result<()> {
        // uq_accounts_email turns a concurrent second insert into Duplicate
        sqlx::query(
            r"INSERT INTO accounts (
                id, email, password_digest, name, phone_number, role, mfa_secret,
                email_verified, phone_verified, created_at, updated_at
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.password_digest)
        .bind(&account.name)
        .bind(&account.phone_number)
        .bind(account.role.as_str())
        .bind(account.mfa_secret.as_deref())
        .bind(account.email_verified)
        .bind(account.phone_verified)
        .bind(account.created_at.timestamp_millis())
        .bind(account.updated_at.timestamp_millis())
        .execute(self.get_sqlx_pool())
        .await
        .map_err(StorageError::from)?;

        debug!("Inserted account {}", account.id);
        Ok(())
    }

    async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_ACCOUNT))
            .bind(id)
            .fetch_optional(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;

        row.map(Account::try_from).transpose()
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("{} WHERE email = ?", SELECT_ACCOUNT))
                .bind(email)
                .fetch_optional(self.get_sqlx_pool())
                .await
                .map_err(StorageError::from)?;

        row.map(Account::try_from).transpose()
    }

    async fn update_verification_status(
        &self,
        id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE accounts
              SET email_verified = ?, phone_verified = ?, updated_at = ?
              WHERE id = ?",
        )
        .bind(email_verified)
        .bind(phone_verified)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .execute(self.get_sqlx_pool())
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("account {}", id)));
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        // sessions go with it through fk_sessions_account
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(self.get_sqlx_pool())
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
