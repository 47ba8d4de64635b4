use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

use crate::storage::StorageError;
use crate::utils::response::error_body;

pub mod password;
pub mod token;

/// Coarse failure classes that decide the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// malformed or missing input
    Validation,
    /// duplicate email
    Conflict,
    /// wrong email or password
    Credentials,
    /// missing, invalid or expired session or token
    Session,
    /// store unreachable or timed out
    Dependency,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Credentials | ErrorKind::Session => StatusCode::UNAUTHORIZED,
            ErrorKind::Dependency => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors produced by the credential and session lifecycle
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("invalid role")]
    InvalidRole,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("{0}")]
    WeakPassword(String),

    #[error("{0} is too long")]
    FieldTooLong(&'static str),

    #[error("user with this email already exists")]
    AccountAlreadyExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired session")]
    InvalidSession,

    #[error("Authorization token required")]
    MissingToken,

    #[error("malformed token")]
    TokenMalformed,

    #[error("token expired")]
    TokenExpired,

    #[error("token signature invalid")]
    TokenSignatureInvalid,

    #[error("token subject not found")]
    AccountNotFound,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Auth result type
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidPayload
            | AuthError::InvalidRole
            | AuthError::InvalidEmail
            | AuthError::WeakPassword(_)
            | AuthError::FieldTooLong(_) => ErrorKind::Validation,
            AuthError::AccountAlreadyExists => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::Credentials,
            AuthError::InvalidSession
            | AuthError::MissingToken
            | AuthError::TokenMalformed
            | AuthError::TokenExpired
            | AuthError::TokenSignatureInvalid
            | AuthError::AccountNotFound => ErrorKind::Session,
            AuthError::StoreUnavailable(_) | AuthError::Internal(_) => ErrorKind::Dependency,
        }
    }

    /// Message sent to the client. Token failures share one wording and
    /// dependency failures never carry their detail.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::TokenMalformed
            | AuthError::TokenExpired
            | AuthError::TokenSignatureInvalid
            | AuthError::AccountNotFound => "Invalid or expired token".to_string(),
            AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(_) => AuthError::AccountAlreadyExists,
            other => AuthError::StoreUnavailable(other.to_string()),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.kind() == ErrorKind::Dependency {
            error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(error_body(&self.public_message()))
    }
}
