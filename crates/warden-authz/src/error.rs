//! Error types for the authorizer.

use std::fmt;

use thiserror::Error;
use warden_core::CoreError;
use warden_store::StoreError;

/// The bootstrap read that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Permissions,
    Roles,
    Grants,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapStage::Permissions => write!(f, "permissions"),
            BootstrapStage::Roles => write!(f, "roles"),
            BootstrapStage::Grants => write!(f, "grants"),
        }
    }
}

/// Errors that can occur during authorizer operations.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Loading the cache from the repository failed.
    #[error("failed to load {stage} during bootstrap: {source}")]
    Bootstrap {
        stage: BootstrapStage,
        #[source]
        source: StoreError,
    },

    /// A role with this id is already cached.
    #[error("role already exists: {0}")]
    RoleExists(String),

    /// No cached role with this id.
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// No cached permission with this id.
    #[error("permission not found: {0}")]
    PermissionNotFound(String),

    /// The superadmin holds every permission; its grants are not editable.
    #[error("role {0} is the superadmin; its grants cannot be assigned or revoked")]
    SuperadminGrants(String),

    /// The grant was persisted but could not be applied to the cache.
    #[error("grant ({role_id}, {permission_id}) persisted but cache diverged: {source}")]
    CacheDiverged {
        role_id: String,
        permission_id: String,
        #[source]
        source: CoreError,
    },

    /// Already assigned / not assigned.
    #[error(transparent)]
    Assignment(#[from] CoreError),

    /// Repository failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthzError {
    /// Whether the request conflicts with existing state.
    pub fn is_conflict(&self) -> bool {
        match self {
            AuthzError::RoleExists(_) | AuthzError::SuperadminGrants(_) => true,
            AuthzError::Assignment(err) => err.is_conflict(),
            AuthzError::Store(err) => err.is_duplicate(),
            _ => false,
        }
    }

    /// Whether the failure lies in the repository itself rather than in
    /// the request: bootstrap failures and backend errors.
    pub fn is_fatal(&self) -> bool {
        match self {
            AuthzError::Bootstrap { .. } => true,
            AuthzError::Store(err) => !err.is_duplicate() && !err.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for authorizer operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
