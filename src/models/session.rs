use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-held proof of an active login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// 256-bit random value, hex encoded
    pub id: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, account_id: String, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id,
            account_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// A session is dead at its expiry instant, not after it
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Short id prefix that is safe to log
    pub fn log_id(&self) -> &str {
        log_prefix(&self.id)
    }
}

/// First 8 characters of a session id
pub fn log_prefix(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
