//! Roles and role/permission grants.
//!
//! A [`Role`] owns its permission set behind its own lock. Assign and revoke
//! are serialized against each other and against concurrent `has` calls, so
//! a role can be mutated safely even outside the authorizer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{CoreError, Result};
use crate::permission::Permission;
use crate::types::now_millis;

/// Anything that can name a role by id.
///
/// Lets callers ask about a role through a full [`Role`], a [`RoleRef`]
/// carried by a user, or a bare id.
pub trait RoleIdentity {
    fn role_id(&self) -> &str;
}

impl RoleIdentity for str {
    fn role_id(&self) -> &str {
        self
    }
}

impl RoleIdentity for String {
    fn role_id(&self) -> &str {
        self
    }
}

impl<T: RoleIdentity + ?Sized> RoleIdentity for &T {
    fn role_id(&self) -> &str {
        (**self).role_id()
    }
}

impl<T: RoleIdentity + ?Sized> RoleIdentity for Arc<T> {
    fn role_id(&self) -> &str {
        (**self).role_id()
    }
}

/// A lightweight reference to a role, as embedded in a user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
    pub name: String,
}

impl RoleRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl RoleIdentity for RoleRef {
    fn role_id(&self) -> &str {
        &self.id
    }
}

/// A role/permission grant as persisted by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub role_id: String,
    pub permission_id: String,
}

impl Grant {
    pub fn new(role_id: impl Into<String>, permission_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            permission_id: permission_id.into(),
        }
    }
}

/// A named grant-holder.
pub struct Role {
    id: String,
    name: String,
    created_at: i64,
    /// Permission set keyed by [`Permission::key`].
    permissions: RwLock<HashMap<String, Permission>>,
}

impl Role {
    /// Create a role with no permissions.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now_millis(),
            permissions: RwLock::new(HashMap::new()),
        }
    }

    /// Override the creation timestamp (used when loading from a store).
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time (Unix ms).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// A [`RoleRef`] naming this role.
    pub fn reference(&self) -> RoleRef {
        RoleRef::new(self.id.clone(), self.name.clone())
    }

    /// Check whether the role currently holds `permission`.
    pub fn has(&self, permission: &Permission) -> bool {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&permission.key())
    }

    /// Add `permission` to the set.
    ///
    /// Re-assigning is an error, never a silent no-op.
    pub fn assign(&self, permission: &Permission) -> Result<()> {
        let mut permissions = self
            .permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let key = permission.key();
        if permissions.contains_key(&key) {
            return Err(CoreError::AlreadyAssigned {
                role: self.id.clone(),
                permission: permission.id().to_string(),
            });
        }
        permissions.insert(key, permission.clone());
        Ok(())
    }

    /// Remove `permission` from the set.
    pub fn revoke(&self, permission: &Permission) -> Result<()> {
        let mut permissions = self
            .permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if permissions.remove(&permission.key()).is_none() {
            return Err(CoreError::NotAssigned {
                role: self.id.clone(),
                permission: permission.id().to_string(),
            });
        }
        Ok(())
    }

    /// Snapshot of the held permission ids, sorted.
    pub fn permission_ids(&self) -> Vec<String> {
        let permissions = self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = permissions.values().map(|p| p.id().to_string()).collect();
        ids.sort();
        ids
    }

    /// Number of held permissions.
    pub fn permission_count(&self) -> usize {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RoleIdentity for Role {
    fn role_id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("permissions", &self.permission_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn update() -> Permission {
        Permission::new("1", "update", "You can update things")
    }

    #[test]
    fn test_assign_then_has() {
        let role = Role::new("1", "admin");
        role.assign(&update()).unwrap();
        assert!(role.has(&update()));
    }

    #[test]
    fn test_assign_twice_conflicts() {
        let role = Role::new("1", "admin");
        role.assign(&update()).unwrap();

        let err = role.assign(&update()).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyAssigned { .. }));
        assert!(err.is_conflict());
        assert_eq!(role.permission_count(), 1);
    }

    #[test]
    fn test_revoke_after_assign() {
        let role = Role::new("1", "admin");
        role.assign(&update()).unwrap();
        role.revoke(&update()).unwrap();
        assert!(!role.has(&update()));
    }

    #[test]
    fn test_revoke_unassigned_conflicts() {
        let role = Role::new("1", "admin");
        let err = role.revoke(&update()).unwrap_err();
        assert!(matches!(err, CoreError::NotAssigned { .. }));
    }

    #[test]
    fn test_permission_ids_snapshot_is_sorted() {
        let role = Role::new("1", "admin");
        assert!(role.permission_ids().is_empty());

        role.assign(&Permission::new("read", "", "")).unwrap();
        role.assign(&Permission::new("delete", "", "")).unwrap();
        let snapshot = role.permission_ids();
        assert_eq!(snapshot, vec!["delete".to_string(), "read".to_string()]);

        role.revoke(&Permission::new("read", "", "")).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(role.permission_ids(), vec!["delete".to_string()]);
    }

    #[test]
    fn test_has_is_case_insensitive() {
        let role = Role::new("1", "admin");
        role.assign(&Permission::new("Read", "read", "")).unwrap();
        assert!(role.has(&Permission::new("read", "read", "")));
    }

    #[test]
    fn test_identity_through_references() {
        let role = Arc::new(Role::new("7", "sales"));
        assert_eq!(role.role_id(), "7");
        assert_eq!(role.reference().role_id(), "7");
        assert_eq!("7".role_id(), "7");
    }

    #[test]
    fn test_concurrent_assign_is_serialized() {
        let role = Arc::new(Role::new("1", "admin"));
        let permission = update();

        // Exactly one of the racing assigns may win.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let role = Arc::clone(&role);
                let permission = permission.clone();
                thread::spawn(move || role.assign(&permission).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert!(role.has(&permission));
    }

    #[test]
    fn test_concurrent_distinct_permissions() {
        let role = Arc::new(Role::new("1", "admin"));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let role = Arc::clone(&role);
                thread::spawn(move || {
                    let p = Permission::new(i.to_string(), format!("p{i}"), "");
                    role.assign(&p).unwrap();
                    assert!(role.has(&p));
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(role.permission_count(), 16);
    }
}
