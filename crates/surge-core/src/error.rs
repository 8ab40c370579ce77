//! Error types for surge operations

use thiserror::Error;

/// Main error type for cache, lock, id and order operations
///
/// Business rejections (sale window, stock, duplicate orders) are NOT errors;
/// they are returned as [`crate::Placement::Rejected`] values. This enum only
/// covers infrastructure failures and integrity faults.
#[derive(Error, Debug, Clone)]
pub enum SurgeError {
    /// Entity absent in both cache and store where its presence is required
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Substrate connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Substrate operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Lock could not be acquired within the configured retry budget
    #[error("lock conflict for key: {0}")]
    LockConflict(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,
}

/// Result type alias for surge operations
pub type Result<T> = std::result::Result<T, SurgeError>;
