// Row shapes for the accounts and sessions tables and their conversion to models.
// Timestamps are stored as BIGINT milliseconds since the epoch.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;

use crate::models::{Account, Role, Session};
use crate::storage::{Result, StorageError};

pub fn datetime_from_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp out of range: {}", millis)))
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub password_digest: String,
    pub name: String,
    pub phone_number: String,
    pub role: String,
    pub mfa_secret: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = StorageError;

    fn try_from(row: AccountRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StorageError::InvalidData(format!("account {}: {}", row.id, e)))?;

        Ok(Account {
            role,
            created_at: datetime_from_millis(row.created_at)?,
            updated_at: datetime_from_millis(row.updated_at)?,
            id: row.id,
            email: row.email,
            password_digest: row.password_digest,
            name: row.name,
            phone_number: row.phone_number,
            mfa_secret: row.mfa_secret,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub account_id: String,
    pub expires_at: i64,
    pub created_at: i64,
}

impl TryFrom<SessionRow> for Session {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Session {
            expires_at: datetime_from_millis(row.expires_at)?,
            created_at: datetime_from_millis(row.created_at)?,
            id: row.id,
            account_id: row.account_id,
        })
    }
}
