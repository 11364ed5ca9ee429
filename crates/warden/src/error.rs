//! Error types for Warden.

use thiserror::Error;
use warden_authz::AuthzError;
use warden_session::SessionError;
use warden_store::StoreError;

/// Authentication failures.
///
/// `UserNotFound` and `InvalidCredentials` render the same message so a
/// caller echoing it cannot be used to probe for accounts.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("the provided credentials are not valid")]
    InvalidCredentials,

    #[error("the provided credentials are not valid")]
    UserNotFound,

    /// No user is bound to the session.
    #[error("session is not authenticated")]
    SessionNotAuthenticated,

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotAuthenticated => AuthError::SessionNotAuthenticated,
            other => AuthError::Store(other),
        }
    }
}

/// Errors that can occur anywhere in Warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Authorization error.
    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for Warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
