// Module declarations
pub mod auth_service;

// Public re-exports
pub use auth_service::{AuthService, LoginOutcome, SignupRequest};
