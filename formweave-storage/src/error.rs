//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (slug, position, single-use handler).
    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    /// The store's lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::IntegrityConflict(_))
    }
}
