//! Authentication service: account signup, credential login, HS256 bearer
//! tokens and server-side sessions with sliding expiry.

// Re-export core functionality for external use
pub use async_trait::async_trait;
pub use sqlx;

// Core module definitions
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;
pub mod utils;

// Unified error handling
pub use error::{Result, ServerError};

// Essential re-exports for convenience
pub use server::{app_state::AppState, startup::start_server};

pub use config::settings::{AuthConfig, Config, DatabaseConfig, ServerConfig};

pub use storage::{
    memory::MemoryStorage, mysql::MySqlStorage, Result as StorageResult, SessionStore, Storage,
    StorageError, StorageFactory, Stores,
};

pub use auth::{AuthError, ErrorKind};
pub use models::{Account, Role, Session};
pub use services::{AuthService, LoginOutcome, SignupRequest};
