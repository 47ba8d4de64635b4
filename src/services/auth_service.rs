use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::auth::password::{validate_password, BcryptHasher, PasswordHasher};
use crate::auth::token::{generate_session_id, TokenIssuer};
use crate::auth::{AuthError, Result};
use crate::config::constants::{MAX_NAME_LENGTH, MAX_PHONE_LENGTH};
use crate::config::AuthConfig;
use crate::models::session::log_prefix;
use crate::models::{Account, Role, Session};
use crate::storage::{SessionStore, Storage, StorageError, Stores};
use crate::utils::validator::{is_valid_email, normalize_email};

// Only ever verified against, never stored
const DUMMY_PASSWORD: &str = "timing-equalizer-not-a-password";

/// Signup input as decoded from the request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "phoneNumber")]
    pub phone_number: String,
    #[serde(default)]
    pub role: String,
}

/// Both authentication proofs minted by a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub token_expires_at: DateTime<Utc>,
    pub session_id: String,
    pub session_expires_at: DateTime<Utc>,
    pub account: Account,
}

/// Orchestrates signup, login and the two validation paths.
///
/// Holds only shared, thread-safe collaborators; every store call is bounded
/// by `store_timeout` and surfaces as `StoreUnavailable` when it runs over.
pub struct AuthService {
    storage: Arc<dyn Storage>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: TokenIssuer,
    session_ttl: chrono::Duration,
    store_timeout: Duration,
    dummy_digest: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        stores: Stores,
        hasher: Arc<dyn PasswordHasher>,
        tokens: TokenIssuer,
        session_ttl: chrono::Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            storage: stores.accounts,
            sessions: stores.sessions,
            hasher,
            tokens,
            session_ttl,
            store_timeout,
            dummy_digest: OnceCell::new(),
        }
    }

    /// bcrypt hasher and HS256 issuer built from configuration
    pub fn from_config(config: &AuthConfig, stores: Stores) -> Self {
        Self::new(
            stores,
            Arc::new(BcryptHasher::new(config.bcrypt_cost)),
            TokenIssuer::from_config(config),
            config.session_ttl(),
            config.store_timeout(),
        )
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.session_ttl
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> std::result::Result<T, StorageError>
    where
        F: Future<Output = std::result::Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store call {} exceeded {:?}", op, self.store_timeout);
                Err(StorageError::QueryTimeout(format!(
                    "{} exceeded {:?}",
                    op, self.store_timeout
                )))
            }
        }
    }

    /// Register a new account. No session or token is created.
    pub async fn signup(&self, request: SignupRequest) -> Result<Account> {
        let role: Role = request.role.parse().map_err(|_| AuthError::InvalidRole)?;

        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        validate_password(&request.password)?;

        let name = request.name.trim().to_string();
        let phone_number = request.phone_number.trim().to_string();
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(AuthError::FieldTooLong("name"));
        }
        if phone_number.chars().count() > MAX_PHONE_LENGTH {
            return Err(AuthError::FieldTooLong("phone_number"));
        }

        // fast path for the common case; the unique key decides races
        let existing = self
            .bounded("get_account_by_email", self.storage.get_account_by_email(&email))
            .await?;
        if existing.is_some() {
            debug!("Signup rejected: email already registered");
            return Err(AuthError::AccountAlreadyExists);
        }

        let digest = self.hasher.hash(&request.password).await?;
        let account = Account::new(
            email,
            digest,
            name,
            phone_number,
            role,
            Utc::now(),
        );

        self.bounded("create_account", self.storage.create_account(&account))
            .await?;

        info!("Registered account {} with role {}", account.id, role);
        Ok(account)
    }

    /// Verify credentials and mint a bearer token plus a server-side session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidPayload);
        }

        let account = match self
            .bounded("get_account_by_email", self.storage.get_account_by_email(&email))
            .await?
        {
            Some(account) => account,
            None => {
                self.verify_dummy(password).await;
                debug!("Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &account.password_digest).await? {
            debug!("Login failed for {}: wrong password", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let issued = self.tokens.issue(&account.id, account.role, now)?;

        let session = Session::new(generate_session_id(), account.id.clone(), now, self.session_ttl);
        self.bounded("create_session", self.sessions.create_session(&session))
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;

        info!("Login for {} opened session {}", account.id, session.log_id());
        Ok(LoginOutcome {
            token: issued.token,
            token_expires_at: issued.expires_at,
            session_id: session.id,
            session_expires_at: session.expires_at,
            account,
        })
    }

    /// Stateless bearer check: signature, algorithm, issuer, expiry, then
    /// resolve the subject. A logged-out session does not revoke the token.
    pub async fn validate_token(&self, token: &str) -> Result<Account> {
        let claims = self.tokens.verify(token)?;

        self.bounded("get_account_by_id", self.storage.get_account_by_id(&claims.sub))
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Look up a live session, resolve its account and slide its expiry to
    /// `now + session_ttl`. Expiry only ever moves forward.
    pub async fn validate_session(&self, session_id: &str) -> Result<Account> {
        if session_id.is_empty() {
            return Err(AuthError::InvalidSession);
        }
        let now = Utc::now();

        let session = self
            .bounded("get_session", self.sessions.get_session(session_id))
            .await?
            .filter(|s| !s.is_expired(now))
            .ok_or(AuthError::InvalidSession)?;

        let account = self
            .bounded("get_account_by_id", self.storage.get_account_by_id(&session.account_id))
            .await?
            .ok_or(AuthError::InvalidSession)?;

        let extended_to = std::cmp::max(session.expires_at, now + self.session_ttl);
        let still_there = self
            .bounded("extend_session", self.sessions.extend_session(session_id, extended_to))
            .await?;
        if !still_there {
            return Err(AuthError::InvalidSession);
        }

        debug!("Session {} extended", log_prefix(session_id));
        Ok(account)
    }

    /// Delete a session. Unknown ids are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        if session_id.is_empty() {
            return Ok(());
        }
        self.bounded("delete_session", self.sessions.delete_session(session_id))
            .await?;
        info!("Session {} closed", log_prefix(session_id));
        Ok(())
    }

    /// Verification flow hook: set both flags on an account
    pub async fn update_verification_status(
        &self,
        account_id: &str,
        email_verified: bool,
        phone_verified: bool,
    ) -> Result<()> {
        self.bounded(
            "update_verification_status",
            self.storage
                .update_verification_status(account_id, email_verified, phone_verified),
        )
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => AuthError::AccountNotFound,
            other => AuthError::from(other),
        })
    }

    /// Remove an account and every session it owns, whichever store holds them
    pub async fn delete_account(&self, account_id: &str) -> Result<()> {
        let closed = self
            .bounded(
                "delete_sessions_for_account",
                self.sessions.delete_sessions_for_account(account_id),
            )
            .await?;
        self.bounded("delete_account", self.storage.delete_account(account_id))
            .await?;
        info!("Deleted account {} and {} session(s)", account_id, closed);
        Ok(())
    }

    /// Drop sessions whose expiry has passed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let removed = self
            .bounded(
                "cleanup_expired_sessions",
                self.sessions.cleanup_expired_sessions(Utc::now()),
            )
            .await?;
        Ok(removed)
    }

    /// Readiness of both stores
    pub async fn stores_ready(&self) -> (bool, bool) {
        let accounts = matches!(
            self.bounded("health_check", self.storage.health_check()).await,
            Ok(true)
        );
        let sessions = matches!(self.bounded("ping", self.sessions.ping()).await, Ok(true));
        (accounts, sessions)
    }

    pub fn storage_type(&self) -> &'static str {
        self.storage.storage_type()
    }

    pub fn session_store_type(&self) -> &'static str {
        self.sessions.store_type()
    }

    /// Spend one verify on unknown emails so both login failures cost the same
    async fn verify_dummy(&self, password: &str) {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| self.hasher.hash(DUMMY_PASSWORD))
            .await;
        match digest {
            Ok(digest) => {
                let _ = self.hasher.verify(password, digest).await;
            }
            Err(e) => warn!("Could not prepare timing digest: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{Result as StorageResult, StorageFactory};
    use async_trait::async_trait;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service_with(stores: Stores, store_timeout: Duration) -> AuthService {
        AuthService::new(
            stores,
            Arc::new(BcryptHasher::new(4)),
            TokenIssuer::new(SECRET, "auth-service", chrono::Duration::hours(24)),
            chrono::Duration::days(7),
            store_timeout,
        )
    }

    fn signup_request(email: &str, role: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            password: "longenough1".into(),
            name: "Test".into(),
            phone_number: "555-0100".into(),
            role: role.into(),
        }
    }

    /// Account store that never answers in time
    struct StalledStorage;

    #[async_trait]
    impl Storage for StalledStorage {
        fn storage_type(&self) -> &'static str {
            "stalled"
        }
        async fn health_check(&self) -> StorageResult<bool> {
            Ok(true)
        }
        async fn close(&self) -> StorageResult<()> {
            Ok(())
        }
        async fn create_account(&self, _account: &Account) -> StorageResult<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn get_account_by_id(&self, _id: &str) -> StorageResult<Option<Account>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
        async fn get_account_by_email(&self, _email: &str) -> StorageResult<Option<Account>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
        async fn update_verification_status(&self, _id: &str, _e: bool, _p: bool) -> StorageResult<()> {
            Ok(())
        }
        async fn delete_account(&self, _id: &str) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn role_is_checked_before_anything_else() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));
        let mut request = signup_request("not-an-email", "superuser");
        request.password = "x".into();

        assert!(matches!(service.signup(request).await, Err(AuthError::InvalidRole)));
    }

    #[tokio::test]
    async fn signup_rejects_bad_email_and_weak_password() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));

        let bad_email = signup_request("nope", "customer");
        assert!(matches!(service.signup(bad_email).await, Err(AuthError::InvalidEmail)));

        let mut weak = signup_request("w@x.com", "customer");
        weak.password = "short".into();
        assert!(matches!(service.signup(weak).await, Err(AuthError::WeakPassword(_))));
    }

    #[tokio::test]
    async fn signup_rejects_profile_fields_past_column_width() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));

        let mut long_phone = signup_request("phone@x.com", "customer");
        long_phone.phone_number = "1".repeat(MAX_PHONE_LENGTH + 8);
        assert!(matches!(
            service.signup(long_phone).await,
            Err(AuthError::FieldTooLong("phone_number"))
        ));

        let mut long_name = signup_request("name@x.com", "customer");
        long_name.name = "n".repeat(MAX_NAME_LENGTH + 1);
        let err = service.signup(long_name).await.unwrap_err();
        assert_eq!(err.kind(), crate::auth::ErrorKind::Validation);

        // widths count characters, so a full-width multibyte name still fits
        let mut wide = signup_request("wide@x.com", "customer");
        wide.name = "é".repeat(MAX_NAME_LENGTH);
        wide.phone_number = format!("  {}  ", "1".repeat(MAX_PHONE_LENGTH));
        let account = service.signup(wide).await.unwrap();
        assert_eq!(account.phone_number.len(), MAX_PHONE_LENGTH);
    }

    #[tokio::test]
    async fn login_with_blank_fields_is_a_bad_payload() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));
        assert!(matches!(
            service.login("", "longenough1").await,
            Err(AuthError::InvalidPayload)
        ));
        assert!(matches!(
            service.login("  ", "longenough1").await,
            Err(AuthError::InvalidPayload)
        ));
        assert!(matches!(
            service.login("a@x.com", "").await,
            Err(AuthError::InvalidPayload)
        ));
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_prefixes_id() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));
        let account = service
            .signup(signup_request("  Vendor@Example.COM ", "vendor"))
            .await
            .unwrap();

        assert_eq!(account.email, "vendor@example.com");
        assert!(account.id.starts_with("vendor_"));
        assert!(!account.email_verified && !account.phone_verified);
        assert_ne!(account.password_digest, "longenough1");
    }

    #[tokio::test]
    async fn stalled_store_surfaces_as_store_unavailable() {
        let memory = Arc::new(MemoryStorage::new());
        let stores = Stores {
            accounts: Arc::new(StalledStorage),
            sessions: memory,
        };
        let service = service_with(stores, Duration::from_millis(50));

        let err = service
            .signup(signup_request("slow@x.com", "customer"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));

        let err = service.login("slow@x.com", "longenough1").await.unwrap_err();
        assert!(matches!(err, AuthError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn verification_status_on_missing_account() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));
        assert!(matches!(
            service.update_verification_status("customer_missing", true, true).await,
            Err(AuthError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn empty_session_id_is_invalid() {
        let service = service_with(StorageFactory::memory(), Duration::from_secs(1));
        assert!(matches!(service.validate_session("").await, Err(AuthError::InvalidSession)));
        assert!(service.logout("").await.is_ok());
    }
}
