//! Error types for Warden Core.

use thiserror::Error;

/// Errors raised by the in-memory model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The role already holds the permission.
    #[error("role {role} already has permission {permission} assigned")]
    AlreadyAssigned { role: String, permission: String },

    /// The role does not hold the permission.
    #[error("role {role} does not have permission {permission} assigned")]
    NotAssigned { role: String, permission: String },

    /// A session identifier could not be parsed.
    #[error("session id present is not valid: {0}")]
    InvalidSessionId(String),
}

impl CoreError {
    /// Whether this is a grant conflict (already/not assigned).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyAssigned { .. } | CoreError::NotAssigned { .. }
        )
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
