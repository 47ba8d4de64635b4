//! Session store on Redis.
//!
//! Each session is a hash at `session:{id}` holding `account_id`,
//! `expires_at` and `created_at` (epoch milliseconds). The key carries a
//! `PEXPIREAT` matching `expires_at`, so Redis drops dead sessions itself.
//! `account_sessions:{account_id}` indexes the ids an account owns.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{Client as RedisClient, Script};
use tracing::{debug, info};

use crate::models::session::log_prefix;
use crate::models::Session;
use crate::storage::mysql_models::datetime_from_millis;
use crate::storage::{Result, SessionStore, StorageError};

const SESSION_KEY_PREFIX: &str = "session:";
const ACCOUNT_INDEX_PREFIX: &str = "account_sessions:";

// Raise expires_at only if the hash still exists and the new value is later
const EXTEND_SCRIPT: &str = r"
local current = redis.call('HGET', KEYS[1], 'expires_at')
if not current then
  return 0
end
if tonumber(ARGV[1]) > tonumber(current) then
  redis.call('HSET', KEYS[1], 'expires_at', ARGV[1])
  redis.call('PEXPIREAT', KEYS[1], ARGV[1])
end
return 1
";

fn session_key(id: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, id)
}

fn account_index_key(account_id: &str) -> String {
    format!("{}{}", ACCOUNT_INDEX_PREFIX, account_id)
}

fn session_from_fields(id: &str, fields: &HashMap<String, String>) -> Result<Option<Session>> {
    if fields.is_empty() {
        return Ok(None);
    }
    let millis = |name: &str| -> Result<DateTime<Utc>> {
        let raw = fields
            .get(name)
            .ok_or_else(|| StorageError::InvalidData(format!("session hash missing {}", name)))?;
        let value = raw
            .parse::<i64>()
            .map_err(|e| StorageError::InvalidData(format!("session {}: {}", name, e)))?;
        datetime_from_millis(value)
    };

    let account_id = fields
        .get("account_id")
        .cloned()
        .ok_or_else(|| StorageError::InvalidData("session hash missing account_id".to_string()))?;

    Ok(Some(Session {
        id: id.to_string(),
        account_id,
        expires_at: millis("expires_at")?,
        created_at: millis("created_at")?,
    }))
}

/// Redis-backed session store
#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
    extend: Script,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = RedisClient::open(url)
            .map_err(|e| StorageError::ConfigurationError(format!("Invalid REDIS_URL: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to Redis: {}", e)))?;

        info!("Redis session store connected");
        Ok(Self {
            manager,
            extend: Script::new(EXTEND_SCRIPT),
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    fn store_type(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<bool> {
        let mut conn = self.manager.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(reply == "PONG")
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        let mut conn = self.manager.clone();
        let key = session_key(&session.id);
        let expires_at = session.expires_at.timestamp_millis();

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(&key)
            .arg("account_id")
            .arg(&session.account_id)
            .arg("expires_at")
            .arg(expires_at)
            .arg("created_at")
            .arg(session.created_at.timestamp_millis())
            .ignore()
            .cmd("PEXPIREAT")
            .arg(&key)
            .arg(expires_at)
            .ignore()
            .cmd("SADD")
            .arg(account_index_key(&session.account_id))
            .arg(&session.id)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        debug!("Stored session {} in Redis", session.log_id());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let mut conn = self.manager.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(session_key(id))
            .query_async(&mut conn)
            .await?;
        session_from_fields(id, &fields)
    }

    async fn extend_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.manager.clone();
        let found: i64 = self
            .extend
            .key(session_key(id))
            .arg(expires_at.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;
        Ok(found == 1)
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let key = session_key(id);
        let account_id: Option<String> = redis::cmd("HGET")
            .arg(&key)
            .arg("account_id")
            .query_async(&mut conn)
            .await?;

        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(&key).ignore();
        if let Some(account_id) = account_id {
            pipe.cmd("SREM").arg(account_index_key(&account_id)).arg(id).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        debug!("Deleted session {} from Redis", log_prefix(id));
        Ok(())
    }

    async fn delete_sessions_for_account(&self, account_id: &str) -> Result<u64> {
        let mut conn = self.manager.clone();
        let index = account_index_key(account_id);
        let ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(&index)
            .query_async(&mut conn)
            .await?;

        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = ids.iter().map(|id| session_key(id)).collect();
        let (removed, _): (u64, u64) = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(&keys)
            .cmd("DEL")
            .arg(&index)
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }

    /// Redis expires the session hashes on its own; this prunes index
    /// entries whose session key is already gone.
    async fn cleanup_expired_sessions(&self, _now: DateTime<Utc>) -> Result<u64> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut pruned = 0u64;

        loop {
            let (next, indexes): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(format!("{}*", ACCOUNT_INDEX_PREFIX))
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            for index in indexes {
                let ids: Vec<String> = redis::cmd("SMEMBERS")
                    .arg(&index)
                    .query_async(&mut conn)
                    .await?;
                for id in ids {
                    let exists: bool = redis::cmd("EXISTS")
                        .arg(session_key(&id))
                        .query_async(&mut conn)
                        .await?;
                    if !exists {
                        let _: i64 = redis::cmd("SREM")
                            .arg(&index)
                            .arg(&id)
                            .query_async(&mut conn)
                            .await?;
                        pruned += 1;
                    }
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(pruned)
    }
}
