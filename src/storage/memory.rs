use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::models::session::log_prefix;
use crate::models::{Account, Session};
use crate::storage::{Result, SessionStore, Storage, StorageError};

// In-memory storage data structure (one lock for both maps)
#[derive(Default)]
struct StorageData {
    accounts: HashMap<String, Account>, // account id -> account
    emails: HashMap<String, String>,    // normalized email -> account id
    sessions: HashMap<String, Session>, // session id -> session
}

/// In-memory storage implementation (useful for testing)
#[derive(Default)]
pub struct MemoryStorage {
    data: TokioMutex<StorageData>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.data.lock().await.sessions.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn storage_type(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn create_account(&self, account: &Account) -> Result<()> {
        let mut data = self.data.lock().await;

        if data.emails.contains_key(&account.email) {
            return Err(StorageError::Duplicate(format!("email {}", account.email)));
        }
        if data.accounts.contains_key(&account.id) {
            return Err(StorageError::Duplicate(format!("id {}", account.id)));
        }

        data.emails.insert(account.email.clone(), account.id.clone());
        data.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account_by_id(&self, id: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data.accounts.get(id).cloned())
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .emails
            .get(email)
            .and_then(|id| data.accounts.get(id))
            .cloned())
    }

    async fn update_verification_status(
        &self,
        id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()> {
        let mut data = self.data.lock().await;
        let account = data
            .accounts
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("account {}", id)))?;

        account.email_verified = email_verified;
        account.phone_verified = phone_verified;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if let Some(account) = data.accounts.remove(id) {
            data.emails.remove(&account.email);
            data.sessions.retain(|_, s| s.account_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStorage {
    fn store_type(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut data = self.data.lock().await;

        // mirrors the foreign key on sessions.account_id
        if !data.accounts.contains_key(&session.account_id) {
            return Err(StorageError::InvalidData(format!(
                "session references unknown account {}",
                session.account_id
            )));
        }
        if data.sessions.contains_key(&session.id) {
            return Err(StorageError::Duplicate(format!("session {}", session.log_id())));
        }

        data.sessions.insert(session.id.clone(), session.clone());
        debug!("Inserted session {}", session.log_id());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let data = self.data.lock().await;
        Ok(data.sessions.get(id).cloned())
    }

    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut data = self.data.lock().await;
        match data.sessions.get_mut(id) {
            Some(session) => {
                if expires_at > session.expires_at {
                    session.expires_at = expires_at;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if data.sessions.remove(id).is_some() {
            debug!("Deleted session {}", log_prefix(id));
        }
        Ok(())
    }

    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64> {
        let mut data = self.data.lock().await;
        let before = data.sessions.len();
        data.sessions.retain(|_, s| s.account_id != account_id);
        Ok((before - data.sessions.len()) as u64)
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut data = self.data.lock().await;
        let before = data.sessions.len();
        data.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - data.sessions.len()) as u64)
    }
}
