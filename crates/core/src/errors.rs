//! Core error types for finlink.
//!
//! Storage- and transport-specific errors (Diesel, reqwest, axum) are converted
//! into these types by the crates that own those dependencies.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the reconciliation and categorization pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The external account provider could not be reached, answered with a
    /// non-success status, or returned a payload we could not decode.
    #[error("Upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An external call did not complete within its time budget.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True for failures of the account provider, including timeouts of provider calls.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_) | Error::Timeout(_))
    }

    /// True for errors caused by the caller's input rather than by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Unauthorized(_))
    }
}

/// Store-agnostic error type for persistence operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persistence layer could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The addressed record does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A persisted record does not match the schema of its entity type.
    #[error("Corrupt record {sort_key}: {reason}")]
    CorruptRecord { sort_key: String, reason: String },
}

impl StoreError {
    pub fn corrupt(sort_key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::CorruptRecord {
            sort_key: sort_key.into(),
            reason: reason.into(),
        }
    }
}

/// Validation errors for caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("JSON error: {}", err))
    }
}
