//! Error types for the session module.

use thiserror::Error;
use warden_store::StoreError;

/// Errors that can occur while reading, writing or persisting sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The token decoded but carries no session id.
    #[error("cookie does not have a valid session id")]
    NoSessionId,

    /// The session id in the token is not a UUID.
    #[error("session id present is not valid: {0}")]
    InvalidSessionId(String),

    /// The token could not be produced.
    #[error("token encoding error: {0}")]
    Encoding(String),

    /// The token is malformed, tampered with or sealed under another key.
    #[error("token rejected: {0}")]
    Token(String),

    /// Repository failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
