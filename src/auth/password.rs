use async_trait::async_trait;

use crate::auth::{AuthError, Result};
use crate::config::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

/// One-way, salted password hashing capability
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String>;

    /// `Ok(false)` on mismatch; `Err` only when the digest itself is unusable
    async fn verify(&self, password: &str, digest: &str) -> Result<bool>;
}

/// bcrypt with a configurable work factor, run on the blocking pool
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

#[async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || {
            bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {}", e)))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Task join error: {}", e)))?
    }

    async fn verify(&self, password: &str, digest: &str) -> Result<bool> {
        let password = password.to_string();
        let digest = digest.to_string();

        tokio::task::spawn_blocking(move || {
            bcrypt::verify(password, &digest)
                .map_err(|e| AuthError::Internal(format!("bcrypt verify: {}", e)))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("Task join error: {}", e)))?
    }
}

/// Length policy checked before hashing: at least 8 characters and at most
/// 72 bytes, since bcrypt ignores everything past byte 72.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
