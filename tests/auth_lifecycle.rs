use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;

use herb_auth_server::auth::token::TokenIssuer;
use herb_auth_server::auth::{AuthError, ErrorKind};
use herb_auth_server::models::{Role, Session};
use herb_auth_server::storage::{SessionStore, Storage};

mod common;

#[tokio::test]
async fn every_role_can_sign_up_and_log_in() {
    let state = common::app_state_with_memory();

    for role in Role::ALL {
        let email = format!("{}@x.com", role);
        let account = state
            .auth
            .signup(common::signup_request(&email, role.as_str()))
            .await
            .unwrap();
        assert!(account.id.starts_with(&format!("{}_", role)));

        let outcome = state.auth.login(&email, common::PASSWORD).await.unwrap();
        assert_eq!(outcome.account.id, account.id);
        assert_eq!(outcome.account.email, email);
        assert_eq!(outcome.account.role, role);
        assert!(outcome.token_expires_at > Utc::now());
        assert!(outcome.session_expires_at > outcome.token_expires_at);
    }
}

#[tokio::test]
async fn duplicate_email_conflicts_in_any_case() {
    let state = common::app_state_with_memory();
    state
        .auth
        .signup(common::signup_request("dup@x.com", "customer"))
        .await
        .unwrap();

    // global uniqueness: a different role does not help
    let err = state
        .auth
        .signup(common::signup_request("DUP@X.com", "vendor"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountAlreadyExists));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn concurrent_identical_signups_admit_exactly_one() {
    let state = common::app_state_with_memory();
    let auth = state.auth.clone();

    let attempts = (0..8).map(|_| {
        let auth = Arc::clone(&auth);
        async move {
            auth.signup(common::signup_request("race@x.com", "healer"))
                .await
        }
    });
    let results = join_all(attempts).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AuthError::AccountAlreadyExists)));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let state = common::app_state_with_memory();
    state
        .auth
        .signup(common::signup_request("known@x.com", "customer"))
        .await
        .unwrap();

    let wrong = state.auth.login("known@x.com", "not-the-password").await.unwrap_err();
    let unknown = state.auth.login("nobody@x.com", common::PASSWORD).await.unwrap_err();

    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert_eq!(wrong.public_message(), unknown.public_message());
}

#[tokio::test]
async fn login_accepts_email_in_any_case() {
    let state = common::app_state_with_memory();
    state
        .auth
        .signup(common::signup_request("mixed@x.com", "admin"))
        .await
        .unwrap();

    assert!(state.auth.login(" Mixed@X.COM", common::PASSWORD).await.is_ok());
}

#[tokio::test]
async fn token_resolves_to_account() {
    let state = common::app_state_with_memory();
    let account = state
        .auth
        .signup(common::signup_request("tok@x.com", "vendor"))
        .await
        .unwrap();
    let outcome = state.auth.login("tok@x.com", common::PASSWORD).await.unwrap();

    let resolved = state.auth.validate_token(&outcome.token).await.unwrap();
    assert_eq!(resolved.id, account.id);
    assert_eq!(resolved.role, Role::Vendor);
}

#[tokio::test]
async fn token_stops_working_at_its_expiry_instant() {
    let state = common::app_state_with_memory();
    state
        .auth
        .signup(common::signup_request("edge@x.com", "customer"))
        .await
        .unwrap();
    let outcome = state.auth.login("edge@x.com", common::PASSWORD).await.unwrap();
    let tokens = state.auth.tokens();

    let just_before = outcome.token_expires_at - Duration::seconds(1);
    assert!(tokens.verify_at(&outcome.token, just_before).is_ok());
    assert!(matches!(
        tokens.verify_at(&outcome.token, outcome.token_expires_at),
        Err(AuthError::TokenExpired)
    ));
}

#[tokio::test]
async fn token_from_another_key_is_rejected() {
    let state = common::app_state_with_memory();
    let account = state
        .auth
        .signup(common::signup_request("forge@x.com", "customer"))
        .await
        .unwrap();

    let forger = TokenIssuer::new(b"another-secret-another-secret-000", "auth-service", Duration::hours(1));
    let forged = forger.issue(&account.id, Role::Admin, Utc::now()).unwrap();

    assert!(matches!(
        state.auth.validate_token(&forged.token).await,
        Err(AuthError::TokenSignatureInvalid)
    ));
}

#[tokio::test]
async fn token_for_deleted_account_is_rejected() {
    let state = common::app_state_with_memory();
    let account = state
        .auth
        .signup(common::signup_request("gone@x.com", "customer"))
        .await
        .unwrap();
    let outcome = state.auth.login("gone@x.com", common::PASSWORD).await.unwrap();

    state.auth.delete_account(&account.id).await.unwrap();

    assert!(matches!(
        state.auth.validate_token(&outcome.token).await,
        Err(AuthError::AccountNotFound)
    ));
    assert!(matches!(
        state.auth.validate_session(&outcome.session_id).await,
        Err(AuthError::InvalidSession)
    ));
}

#[tokio::test]
async fn session_validation_slides_expiry_forward() {
    let (state, memory) = common::app_state_with_shared_memory();
    state
        .auth
        .signup(common::signup_request("slide@x.com", "healer"))
        .await
        .unwrap();
    let outcome = state.auth.login("slide@x.com", common::PASSWORD).await.unwrap();

    let before = memory.get_session(&outcome.session_id).await.unwrap().unwrap();
    let account = state.auth.validate_session(&outcome.session_id).await.unwrap();
    let after = memory.get_session(&outcome.session_id).await.unwrap().unwrap();

    assert_eq!(account.email, "slide@x.com");
    assert!(after.expires_at >= before.expires_at);
    assert!(after.expires_at >= Utc::now() + Duration::days(7) - Duration::seconds(5));
}

#[tokio::test]
async fn extension_never_shortens_a_longer_session() {
    let (state, memory) = common::app_state_with_shared_memory();
    let account = state
        .auth
        .signup(common::signup_request("long@x.com", "customer"))
        .await
        .unwrap();

    let now = Utc::now();
    let long_lived = Session::new("long-lived".into(), account.id.clone(), now, Duration::days(30));
    memory.create_session(&long_lived).await.unwrap();

    state.auth.validate_session("long-lived").await.unwrap();
    let after = memory.get_session("long-lived").await.unwrap().unwrap();
    assert_eq!(after.expires_at, long_lived.expires_at);
}

#[tokio::test]
async fn expired_session_is_indistinguishable_from_missing() {
    let (state, memory) = common::app_state_with_shared_memory();
    let account = state
        .auth
        .signup(common::signup_request("stale@x.com", "customer"))
        .await
        .unwrap();

    let past = Utc::now() - Duration::days(8);
    let stale = Session::new("stale-session".into(), account.id, past, Duration::days(7));
    memory.create_session(&stale).await.unwrap();

    let expired = state.auth.validate_session("stale-session").await.unwrap_err();
    let missing = state.auth.validate_session("never-existed").await.unwrap_err();

    assert!(matches!(expired, AuthError::InvalidSession));
    assert!(matches!(missing, AuthError::InvalidSession));
    assert_eq!(expired.public_message(), missing.public_message());

    // validation never revives it
    let still = memory.get_session("stale-session").await.unwrap().unwrap();
    assert_eq!(still.expires_at, stale.expires_at);
}

#[tokio::test]
async fn logout_ends_session_but_not_token() {
    let state = common::app_state_with_memory();
    state
        .auth
        .signup(common::signup_request("bye@x.com", "admin"))
        .await
        .unwrap();
    let outcome = state.auth.login("bye@x.com", common::PASSWORD).await.unwrap();

    state.auth.logout(&outcome.session_id).await.unwrap();
    assert!(matches!(
        state.auth.validate_session(&outcome.session_id).await,
        Err(AuthError::InvalidSession)
    ));
    // idempotent
    state.auth.logout(&outcome.session_id).await.unwrap();

    // bearer tokens live until their own expiry
    assert!(state.auth.validate_token(&outcome.token).await.is_ok());
}

#[tokio::test]
async fn each_login_opens_its_own_session() {
    let (state, memory) = common::app_state_with_shared_memory();
    state
        .auth
        .signup(common::signup_request("multi@x.com", "vendor"))
        .await
        .unwrap();

    let first = state.auth.login("multi@x.com", common::PASSWORD).await.unwrap();
    let second = state.auth.login("multi@x.com", common::PASSWORD).await.unwrap();

    assert_ne!(first.session_id, second.session_id);
    assert_eq!(memory.session_count().await, 2);
}

#[tokio::test]
async fn verification_flags_update() {
    let state = common::app_state_with_memory();
    let account = state
        .auth
        .signup(common::signup_request("verify@x.com", "healer"))
        .await
        .unwrap();

    state
        .auth
        .update_verification_status(&account.id, true, true)
        .await
        .unwrap();

    let stored = state
        .stores
        .accounts
        .get_account_by_id(&account.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.email_verified && stored.phone_verified);
    assert!(stored.updated_at >= account.updated_at);
    assert_eq!(stored.created_at, account.created_at);
}

#[tokio::test]
async fn cleanup_reaps_only_expired_sessions() {
    let (state, memory) = common::app_state_with_shared_memory();
    let account = state
        .auth
        .signup(common::signup_request("reap@x.com", "customer"))
        .await
        .unwrap();
    let live = state.auth.login("reap@x.com", common::PASSWORD).await.unwrap();

    let past = Utc::now() - Duration::days(10);
    memory
        .create_session(&Session::new("old".into(), account.id, past, Duration::days(7)))
        .await
        .unwrap();

    assert_eq!(state.auth.cleanup_expired_sessions().await.unwrap(), 1);
    assert!(state.auth.validate_session(&live.session_id).await.is_ok());
}
