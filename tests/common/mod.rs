// Common test helpers for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use herb_auth_server::config::{AuthConfig, Config};
use herb_auth_server::services::SignupRequest;
use herb_auth_server::storage::memory::MemoryStorage;
use herb_auth_server::storage::{StorageFactory, Stores};
use herb_auth_server::AppState;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const PASSWORD: &str = "longenough1";

/// Defaults with a fixed secret, the cheapest bcrypt cost and no reaper
pub fn test_config() -> Config {
    let mut auth = AuthConfig::new(TEST_SECRET);
    auth.bcrypt_cost = 4;
    auth.session_cleanup_interval_secs = 0;
    Config::with_auth(auth)
}

pub fn app_state_with_memory() -> AppState {
    AppState::new(test_config(), StorageFactory::memory())
}

/// State plus a handle on the backing store for direct inspection
pub fn app_state_with_shared_memory() -> (AppState, Arc<MemoryStorage>) {
    let memory = Arc::new(MemoryStorage::new());
    let stores = Stores {
        accounts: memory.clone(),
        sessions: memory.clone(),
    };
    (AppState::new(test_config(), stores), memory)
}

pub fn app_state_with_stores(stores: Stores) -> AppState {
    AppState::new(test_config(), stores)
}

pub fn signup_request(email: &str, role: &str) -> SignupRequest {
    SignupRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        name: "Test User".to_string(),
        phone_number: "+15550100".to_string(),
        role: role.to_string(),
    }
}
