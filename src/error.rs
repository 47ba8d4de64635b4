use thiserror::Error;

use crate::storage::StorageError;

/// Process-level error type used during bootstrap, configuration and server lifecycle
#[derive(Debug, Error, Clone)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Connection(msg) => ServerError::ServiceUnavailable(msg),
            StorageError::QueryTimeout(msg) => ServerError::Timeout(msg),
            StorageError::ConfigurationError(msg) => ServerError::Config(msg),
            _ => ServerError::Storage(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_store_fails_startup_as_unavailable() {
        let err: ServerError = StorageError::Connection("connection refused".into()).into();
        assert!(matches!(err, ServerError::ServiceUnavailable(_)));
        assert_eq!(err.to_string(), "Service unavailable: connection refused");
    }

    #[test]
    fn schema_failures_keep_their_detail() {
        let err: ServerError = StorageError::Database("Failed to create accounts table".into()).into();
        assert_eq!(
            err.to_string(),
            "Storage error: Database error: Failed to create accounts table"
        );
    }
}
