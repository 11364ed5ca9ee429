//! In-memory implementation of the repository traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use warden_core::{Credentials, Grant, Permission, Role, RoleRef, Session, SessionStore, User};

use crate::error::{Result, StoreError};
use crate::traits::{bound_user_id, AuthRepo, SessionRecord, SessionRepo, UserAuthRepo};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Permissions keyed by [`Permission::key`].
    permissions: BTreeMap<String, Permission>,

    /// Roles keyed by id.
    roles: BTreeMap<String, StoredRole>,

    /// Grants as (role id, permission key).
    grants: BTreeSet<(String, String)>,

    /// Users keyed by id.
    users: HashMap<i64, User>,
    next_user_id: i64,

    sessions: HashMap<Uuid, SessionRecord>,
}

struct StoredRole {
    name: String,
    created_at: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                next_user_id: 1,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    /// A stored user with its role name refreshed from the roles table.
    fn resolve_user(&self, user: &User) -> User {
        let mut user = user.clone();
        if let Some(role) = self.roles.get(&user.role.id) {
            user.role = RoleRef::new(user.role.id.clone(), role.name.clone());
        }
        user
    }
}

#[async_trait]
impl AuthRepo for MemoryStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.read().permissions.values().cloned().collect())
    }

    async fn get_permission(&self, permission: &Permission) -> Result<Option<Permission>> {
        Ok(self.read().permissions.get(&permission.key()).cloned())
    }

    async fn create_permission(&self, permission: &Permission) -> Result<Permission> {
        let mut inner = self.write();

        let key = permission.key();
        if inner.permissions.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("permission {}", permission.id())));
        }

        inner.permissions.insert(key, permission.clone());
        Ok(permission.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_roles(&self) -> Result<Vec<Role>> {
        Ok(self
            .read()
            .roles
            .iter()
            .map(|(id, stored)| {
                Role::new(id.clone(), stored.name.clone()).with_created_at(stored.created_at)
            })
            .collect())
    }

    async fn get_role(&self, role: &Role) -> Result<Option<Role>> {
        Ok(self.read().roles.get(role.id()).map(|stored| {
            Role::new(role.id(), stored.name.clone()).with_created_at(stored.created_at)
        }))
    }

    async fn create_role(&self, role: &Role) -> Result<Role> {
        let mut inner = self.write();

        if inner.roles.contains_key(role.id()) {
            return Err(StoreError::Duplicate(format!("role {}", role.id())));
        }

        inner.roles.insert(
            role.id().to_string(),
            StoredRole {
                name: role.name().to_string(),
                created_at: role.created_at(),
            },
        );

        Ok(Role::new(role.id(), role.name()).with_created_at(role.created_at()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_grants(&self) -> Result<Vec<Grant>> {
        let inner = self.read();
        Ok(inner
            .grants
            .iter()
            .map(|(role_id, key)| {
                let permission_id = inner
                    .permissions
                    .get(key)
                    .map(|p| p.id().to_string())
                    .unwrap_or_else(|| key.clone());
                Grant::new(role_id.clone(), permission_id)
            })
            .collect())
    }

    async fn assign_permission_to_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        let mut inner = self.write();

        let key = Permission::key_for(permission_id);
        if !inner.roles.contains_key(role_id) {
            return Err(StoreError::NotFound(format!("role {}", role_id)));
        }
        if !inner.permissions.contains_key(&key) {
            return Err(StoreError::NotFound(format!("permission {}", permission_id)));
        }

        if !inner.grants.insert((role_id.to_string(), key)) {
            return Err(StoreError::Duplicate(format!(
                "grant ({}, {})",
                role_id, permission_id
            )));
        }

        Ok(())
    }

    async fn revoke_permission_from_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        let mut inner = self.write();

        let grant = (role_id.to_string(), Permission::key_for(permission_id));
        if !inner.grants.remove(&grant) {
            return Err(StoreError::NotFound(format!(
                "grant ({}, {})",
                role_id, permission_id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl UserAuthRepo for MemoryStore {
    async fn get_user_by_credentials(&self, credentials: &Credentials) -> Result<Option<User>> {
        let inner = self.read();
        Ok(inner
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(&credentials.username))
            .map(|user| inner.resolve_user(user)))
    }

    async fn get_user_from_session(&self, session: &Session) -> Result<User> {
        let user_id = bound_user_id(session)?;

        let inner = self.read();
        inner
            .users
            .get(&user_id)
            .map(|user| inner.resolve_user(user))
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        let mut inner = self.write();

        if inner
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate(format!("user {}", user.email)));
        }
        if !inner.roles.contains_key(&user.role.id) {
            return Err(StoreError::NotFound(format!("role {}", user.role.id)));
        }

        let mut stored = user.clone();
        stored.id = inner.next_user_id;
        inner.next_user_id += 1;
        inner.users.insert(stored.id, stored.clone());

        Ok(inner.resolve_user(&stored))
    }
}

#[async_trait]
impl SessionRepo for MemoryStore {
    async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let mut inner = self.write();

        if inner.sessions.contains_key(&record.id) {
            return Err(StoreError::Duplicate(format!("session {}", record.id)));
        }

        inner.sessions.insert(record.id, record.clone());
        Ok(())
    }

    async fn load_session(&self, id: &Uuid, now: i64) -> Result<Option<SessionRecord>> {
        Ok(self
            .read()
            .sessions
            .get(id)
            .filter(|record| record.expires_at >= now)
            .cloned())
    }

    async fn update_session(
        &self,
        id: &Uuid,
        expires_at: i64,
        contents: Option<&SessionStore>,
    ) -> Result<()> {
        let mut inner = self.write();

        let record = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", id)))?;

        record.expires_at = expires_at;
        if let Some(contents) = contents {
            record.contents = Some(contents.clone());
        }

        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<()> {
        self.write().sessions.remove(id);
        Ok(())
    }
}
