//! Error types for Breach Radar infrastructure

use thiserror::Error;

/// Errors that can occur while resolving the catalog or querying field data
#[derive(Error, Debug)]
pub enum BreachError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Breach not present in the catalog
    #[error("breach not found: {0}")]
    BreachNotFound(String),

    /// Field name outside the known vocabulary, or with no storage mapping
    #[error("unsupported field: {0}")]
    UnsupportedField(String),

    /// Table or column identifier that failed the allow-list check
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Hash prefix rejected by the prefix policy
    #[error("invalid hash prefix: {0}")]
    InvalidPrefix(String),

    /// Malformed search request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Catalog record violating a metadata invariant
    #[error("invalid metadata for breach {breach}: {reason}")]
    InvalidMetadata { breach: String, reason: String },

    /// Storage call exceeded the request deadline
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Fixture file could not be read
    #[error("fixture error: {0}")]
    Fixture(#[from] std::io::Error),

    /// Fixture file is not valid catalog JSON
    #[error("fixture format error: {0}")]
    FixtureFormat(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BreachError {
    /// Errors caused by the caller's input rather than by storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BreachError::UnsupportedField(_)
                | BreachError::InvalidPrefix(_)
                | BreachError::InvalidRequest(_)
        )
    }
}

/// Result type for breach operations
pub type Result<T> = std::result::Result<T, BreachError>;
