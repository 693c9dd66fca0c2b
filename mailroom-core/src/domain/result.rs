//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by the account store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// A unique column (handle, provider external id) already holds this value
    #[error("Uniqueness violation on {field}: {value}")]
    UniquenessViolation { field: String, value: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl Error {
    /// Create an invalid identity error
    pub fn invalid_identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    /// Create an invalid callback error
    pub fn invalid_callback(msg: impl Into<String>) -> Self {
        Self::InvalidCallback(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an external service error
    pub fn external(service: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: msg.into(),
        }
    }

    /// Create a uniqueness violation error
    pub fn uniqueness(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Persistence(PersistenceError::UniquenessViolation {
            field: field.into(),
            value: value.into(),
        })
    }

    /// True when the store rejected a write because of a unique constraint
    pub fn is_uniqueness_violation(&self) -> bool {
        matches!(
            self,
            Self::Persistence(PersistenceError::UniquenessViolation { .. })
        )
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniqueness_helper() {
        let err = Error::uniqueness("handle", "ada");
        assert!(err.is_uniqueness_violation());
        assert_eq!(err.to_string(), "Uniqueness violation on handle: ada");
    }

    #[test]
    fn test_external_error_message() {
        let err = Error::external("twitter", "HTTP 500");
        assert!(!err.is_uniqueness_violation());
        assert!(err.to_string().contains("twitter"));
    }
}
