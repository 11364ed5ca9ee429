//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Session contents could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row with the same key already exists.
    #[error("cannot insert duplicate key: {0}")]
    Duplicate(String),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No user identity is bound to the session.
    #[error("session is not authenticated")]
    SessionNotAuthenticated,

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Whether this error reports a duplicate-key conflict.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate(_))
    }

    /// Whether this error reports a missing row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
