//! Repository traits: the narrow contracts Warden persists through.
//!
//! All methods are async to support both blocking (SQLite) and async backends.
//! For SQLite, `spawn_blocking` is used internally to avoid blocking the runtime.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use warden_core::{
    Credentials, Grant, Permission, Role, Session, SessionStore, User, USER_ID_SESSION_KEY,
};

use crate::error::{Result, StoreError};

/// Persistence for permissions, roles and their grants.
#[async_trait]
pub trait AuthRepo: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    /// List every stored permission.
    async fn get_permissions(&self) -> Result<Vec<Permission>>;

    /// Fetch the stored permission with the same identity.
    async fn get_permission(&self, permission: &Permission) -> Result<Option<Permission>>;

    /// Insert a permission.
    ///
    /// Returns [`StoreError::Duplicate`](crate::StoreError::Duplicate) if the
    /// id is already taken.
    async fn create_permission(&self, permission: &Permission) -> Result<Permission>;

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    /// List every stored role. Returned roles hold no permissions.
    async fn get_roles(&self) -> Result<Vec<Role>>;

    /// Fetch the stored role with the same id.
    async fn get_role(&self, role: &Role) -> Result<Option<Role>>;

    /// Insert a role.
    async fn create_role(&self, role: &Role) -> Result<Role>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    /// List every role/permission grant.
    async fn get_grants(&self) -> Result<Vec<Grant>>;

    /// Record a grant. Duplicate grants are reported as `Duplicate`.
    async fn assign_permission_to_role(&self, role_id: &str, permission_id: &str) -> Result<()>;

    /// Delete a grant. A missing grant is reported as `NotFound`.
    async fn revoke_permission_from_role(&self, role_id: &str, permission_id: &str) -> Result<()>;
}

/// Persistence for users, as needed by authentication.
#[async_trait]
pub trait UserAuthRepo: Send + Sync {
    /// Look up the user named by `credentials`. The password is not checked.
    async fn get_user_by_credentials(&self, credentials: &Credentials) -> Result<Option<User>>;

    /// Resolve the user bound to `session`.
    ///
    /// Returns [`StoreError::SessionNotAuthenticated`](crate::StoreError::SessionNotAuthenticated)
    /// when no user id is bound.
    async fn get_user_from_session(&self, session: &Session) -> Result<User>;

    /// Insert a user, returning it with its assigned id.
    async fn create_user(&self, user: &User) -> Result<User>;
}

/// The user id bound to `session`, accepting numbers or numeric strings.
pub(crate) fn bound_user_id(session: &Session) -> Result<i64> {
    let value = session
        .get(USER_ID_SESSION_KEY)
        .ok_or(StoreError::SessionNotAuthenticated)?;

    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| StoreError::InvalidData(format!("bound user id {value} is not numeric")))
}

/// A persisted session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    /// Expiration (Unix ms).
    pub expires_at: i64,
    /// Stored contents; `None` until the first dirty save.
    pub contents: Option<SessionStore>,
}

impl SessionRecord {
    /// Snapshot the persistable state of a session.
    pub fn from_session(session: &Session) -> Self {
        Self {
            id: session.uuid(),
            expires_at: session.expires_at(),
            contents: None,
        }
    }

    /// Rebuild a session, loading contents without marking it dirty.
    pub fn into_session(self) -> Session {
        let session = Session::restore(self.id, self.expires_at);
        if let Some(contents) = self.contents {
            session.replace_store(contents);
        }
        session
    }
}

/// Persistence for sessions.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    /// Insert a new session record.
    async fn insert_session(&self, record: &SessionRecord) -> Result<()>;

    /// Load a session that has not expired as of `now` (Unix ms).
    async fn load_session(&self, id: &Uuid, now: i64) -> Result<Option<SessionRecord>>;

    /// Update the expiration, and the contents when `contents` is `Some`.
    async fn update_session(
        &self,
        id: &Uuid,
        expires_at: i64,
        contents: Option<&SessionStore>,
    ) -> Result<()>;

    /// Delete a session record.
    async fn delete_session(&self, id: &Uuid) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared ownership: let an `Arc<S>` stand in wherever `S` is expected.
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl<T: AuthRepo + ?Sized> AuthRepo for Arc<T> {
    async fn get_permissions(&self) -> Result<Vec<Permission>> {
        (**self).get_permissions().await
    }

    async fn get_permission(&self, permission: &Permission) -> Result<Option<Permission>> {
        (**self).get_permission(permission).await
    }

    async fn create_permission(&self, permission: &Permission) -> Result<Permission> {
        (**self).create_permission(permission).await
    }

    async fn get_roles(&self) -> Result<Vec<Role>> {
        (**self).get_roles().await
    }

    async fn get_role(&self, role: &Role) -> Result<Option<Role>> {
        (**self).get_role(role).await
    }

    async fn create_role(&self, role: &Role) -> Result<Role> {
        (**self).create_role(role).await
    }

    async fn get_grants(&self) -> Result<Vec<Grant>> {
        (**self).get_grants().await
    }

    async fn assign_permission_to_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        (**self).assign_permission_to_role(role_id, permission_id).await
    }

    async fn revoke_permission_from_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        (**self).revoke_permission_from_role(role_id, permission_id).await
    }
}

#[async_trait]
impl<T: UserAuthRepo + ?Sized> UserAuthRepo for Arc<T> {
    async fn get_user_by_credentials(&self, credentials: &Credentials) -> Result<Option<User>> {
        (**self).get_user_by_credentials(credentials).await
    }

    async fn get_user_from_session(&self, session: &Session) -> Result<User> {
        (**self).get_user_from_session(session).await
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        (**self).create_user(user).await
    }
}

#[async_trait]
impl<T: SessionRepo + ?Sized> SessionRepo for Arc<T> {
    async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        (**self).insert_session(record).await
    }

    async fn load_session(&self, id: &Uuid, now: i64) -> Result<Option<SessionRecord>> {
        (**self).load_session(id, now).await
    }

    async fn update_session(
        &self,
        id: &Uuid,
        expires_at: i64,
        contents: Option<&SessionStore>,
    ) -> Result<()> {
        (**self).update_session(id, expires_at, contents).await
    }

    async fn delete_session(&self, id: &Uuid) -> Result<()> {
        (**self).delete_session(id).await
    }
}
