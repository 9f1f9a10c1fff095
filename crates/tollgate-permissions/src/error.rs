//! Permission subsystem errors.

use thiserror::Error;

/// Result alias for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors from the permission authority.
#[derive(Debug, Error)]
pub enum PermissionError {
    /// An interior lock was poisoned.
    #[error("lock error: {0}")]
    Lock(String),

    /// The store document could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store file could not be written.
    ///
    /// Load failures never produce this: a missing or corrupt file degrades
    /// to an empty in-memory state instead.
    #[error("storage error: {0}")]
    Storage(String),
}
