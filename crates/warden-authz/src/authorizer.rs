//! The authorizer: an in-memory cache of roles, permissions and grants.
//!
//! Reads (`granted`) are answered entirely from memory under the read lock.
//! Mutations take the write lock, write to the repository first and only
//! then update the cache, so the cache never holds a grant the repository
//! refused.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use warden_core::{CoreError, Permission, Role, RoleIdentity};
use warden_store::{AuthRepo, StoreError};

use crate::error::{AuthzError, BootstrapStage, Result};

/// Role-based authorization backed by an [`AuthRepo`].
pub struct Authorizer<R> {
    repo: R,
    cache: RwLock<AuthzCache>,
}

#[derive(Default)]
struct AuthzCache {
    /// Roles keyed by id.
    roles: HashMap<String, Arc<Role>>,

    /// Permissions keyed by [`Permission::key`].
    permissions: HashMap<String, Permission>,

    superadmin: Option<Arc<Role>>,
}

impl AuthzCache {
    fn role(&self, role_id: &str) -> Option<&Arc<Role>> {
        self.roles.get(role_id)
    }

    fn permission(&self, permission_id: &str) -> Option<&Permission> {
        self.permissions.get(&Permission::key_for(permission_id))
    }

    fn ensure_editable(&self, role_id: &str) -> Result<()> {
        match &self.superadmin {
            Some(superadmin) if superadmin.id() == role_id => {
                Err(AuthzError::SuperadminGrants(role_id.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn bootstrap(stage: BootstrapStage) -> impl FnOnce(StoreError) -> AuthzError {
    move |source| AuthzError::Bootstrap { stage, source }
}

impl<R: AuthRepo> Authorizer<R> {
    /// Load every permission, role and grant from `repo`.
    ///
    /// Grants naming an unknown permission are skipped. A grant naming an
    /// unknown role, or any repository failure, aborts construction.
    pub async fn new(repo: R) -> Result<Self> {
        let permissions = repo
            .get_permissions()
            .await
            .map_err(bootstrap(BootstrapStage::Permissions))?;
        let roles = repo
            .get_roles()
            .await
            .map_err(bootstrap(BootstrapStage::Roles))?;
        let grants = repo
            .get_grants()
            .await
            .map_err(bootstrap(BootstrapStage::Grants))?;

        let mut cache = AuthzCache::default();
        for permission in permissions {
            cache.permissions.insert(permission.key(), permission);
        }
        for role in roles {
            cache.roles.insert(role.id().to_string(), Arc::new(role));
        }

        let mut applied = 0usize;
        for grant in &grants {
            let Some(role) = cache.role(&grant.role_id) else {
                return Err(AuthzError::Bootstrap {
                    stage: BootstrapStage::Grants,
                    source: StoreError::InvalidData(format!(
                        "grant ({}, {}) references unknown role",
                        grant.role_id, grant.permission_id
                    )),
                });
            };
            let Some(permission) = cache.permission(&grant.permission_id) else {
                tracing::warn!(
                    role = %grant.role_id,
                    permission = %grant.permission_id,
                    "skipping grant for unknown permission"
                );
                continue;
            };

            match role.assign(permission) {
                Ok(()) => applied += 1,
                Err(err) => tracing::warn!(%err, "ignoring duplicate grant row"),
            }
        }

        tracing::info!(
            permissions = cache.permissions.len(),
            roles = cache.roles.len(),
            grants = applied,
            "authorizer loaded"
        );

        Ok(Self {
            repo,
            cache: RwLock::new(cache),
        })
    }

    /// The backing repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `role` currently holds `permission`. Unknown roles hold nothing.
    pub async fn granted<I>(&self, role: &I, permission: &Permission) -> bool
    where
        I: RoleIdentity + ?Sized,
    {
        let cache = self.cache.read().await;
        cache
            .role(role.role_id())
            .is_some_and(|role| role.has(permission))
    }

    /// All permissions in the repository.
    pub async fn get_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.repo.get_permissions().await?)
    }

    /// All roles in the repository, without their grants.
    pub async fn get_roles(&self) -> Result<Vec<Role>> {
        Ok(self.repo.get_roles().await?)
    }

    pub async fn has_role(&self, role_id: &str) -> bool {
        self.cache.read().await.roles.contains_key(role_id)
    }

    pub async fn has_permission(&self, permission_id: &str) -> bool {
        self.cache.read().await.permission(permission_id).is_some()
    }

    /// The cached role with this id.
    pub async fn role(&self, role_id: &str) -> Option<Arc<Role>> {
        self.cache.read().await.role(role_id).cloned()
    }

    /// The cached permission with this id.
    pub async fn permission(&self, permission_id: &str) -> Option<Permission> {
        self.cache.read().await.permission(permission_id).cloned()
    }

    /// The designated superadmin role, if any.
    pub async fn superadmin(&self) -> Option<Arc<Role>> {
        self.cache.read().await.superadmin.clone()
    }

    pub async fn role_count(&self) -> usize {
        self.cache.read().await.roles.len()
    }

    pub async fn permission_count(&self) -> usize {
        self.cache.read().await.permissions.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a permission, reusing the stored one if the id is taken.
    ///
    /// The superadmin, if designated, is granted the permission.
    pub async fn add_permission(&self, permission: &Permission) -> Result<Permission> {
        let mut cache = self.cache.write().await;

        let stored = match self.repo.create_permission(permission).await {
            Ok(stored) => stored,
            Err(err) if err.is_duplicate() => {
                tracing::debug!(permission = %permission, "permission already stored");
                self.repo
                    .get_permission(permission)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("permission {}", permission)))?
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(superadmin) = &cache.superadmin {
            if let Err(err) = superadmin.assign(&stored) {
                tracing::debug!(%err, "superadmin already holds permission");
            }
        }

        cache.permissions.insert(stored.key(), stored.clone());
        Ok(stored)
    }

    /// Persist and cache a new role.
    pub async fn create_role(&self, role: Role) -> Result<Arc<Role>> {
        let mut cache = self.cache.write().await;
        Self::create_role_locked(&self.repo, &mut cache, &role).await
    }

    async fn create_role_locked(repo: &R, cache: &mut AuthzCache, role: &Role) -> Result<Arc<Role>> {
        if cache.roles.contains_key(role.id()) {
            return Err(AuthzError::RoleExists(role.id().to_string()));
        }

        let created = Arc::new(repo.create_role(role).await?);
        cache
            .roles
            .insert(created.id().to_string(), Arc::clone(&created));

        tracing::debug!(role = created.id(), "role created");
        Ok(created)
    }

    /// Grant `permission` to `role`, in the repository and then in the cache.
    ///
    /// The superadmin is refused with [`AuthzError::SuperadminGrants`].
    pub async fn assign_permission_to_role<I>(&self, role: &I, permission: &Permission) -> Result<()>
    where
        I: RoleIdentity + ?Sized,
    {
        let cache = self.cache.write().await;

        let role_id = role.role_id();
        let cached_role = cache
            .role(role_id)
            .ok_or_else(|| AuthzError::RoleNotFound(role_id.to_string()))?;
        cache.ensure_editable(role_id)?;
        let cached_permission = cache
            .permission(permission.id())
            .ok_or_else(|| AuthzError::PermissionNotFound(permission.id().to_string()))?;

        match self
            .repo
            .assign_permission_to_role(role_id, cached_permission.id())
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_duplicate() => {
                return Err(CoreError::AlreadyAssigned {
                    role: role_id.to_string(),
                    permission: cached_permission.id().to_string(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        cached_role
            .assign(cached_permission)
            .map_err(|source| AuthzError::CacheDiverged {
                role_id: role_id.to_string(),
                permission_id: cached_permission.id().to_string(),
                source,
            })?;

        tracing::debug!(role = role_id, permission = %cached_permission, "permission assigned");
        Ok(())
    }

    /// Remove `permission` from `role`, in the repository and then in the cache.
    ///
    /// The superadmin is refused with [`AuthzError::SuperadminGrants`].
    pub async fn revoke_permission_from_role<I>(&self, role: &I, permission: &Permission) -> Result<()>
    where
        I: RoleIdentity + ?Sized,
    {
        let cache = self.cache.write().await;

        let role_id = role.role_id();
        let cached_role = cache
            .role(role_id)
            .ok_or_else(|| AuthzError::RoleNotFound(role_id.to_string()))?;
        cache.ensure_editable(role_id)?;

        match self
            .repo
            .revoke_permission_from_role(role_id, permission.id())
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                return Err(CoreError::NotAssigned {
                    role: role_id.to_string(),
                    permission: permission.id().to_string(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        cached_role
            .revoke(permission)
            .map_err(|source| AuthzError::CacheDiverged {
                role_id: role_id.to_string(),
                permission_id: permission.id().to_string(),
                source,
            })?;

        tracing::debug!(role = role_id, permission = %permission, "permission revoked");
        Ok(())
    }

    /// Designate `role` as superadmin, creating it if the repository lacks it.
    ///
    /// The superadmin holds every cached permission and every permission added
    /// later. These grants live only in the cache.
    pub async fn create_super_admin(&self, role: Role) -> Result<Arc<Role>> {
        let mut cache = self.cache.write().await;

        let superadmin = match self.repo.get_role(&role).await? {
            Some(stored) => {
                let cached = cache.role(stored.id()).cloned();
                cached.unwrap_or_else(|| {
                    let stored = Arc::new(stored);
                    cache
                        .roles
                        .insert(stored.id().to_string(), Arc::clone(&stored));
                    stored
                })
            }
            None => Self::create_role_locked(&self.repo, &mut cache, &role).await?,
        };

        for permission in cache.permissions.values() {
            // Holding it already is the desired end state.
            let _ = superadmin.assign(permission);
        }
        cache.superadmin = Some(Arc::clone(&superadmin));

        tracing::info!(
            role = superadmin.id(),
            permissions = superadmin.permission_count(),
            "superadmin designated"
        );
        Ok(superadmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{Grant, RoleRef, User};
    use warden_store::MemoryStore;

    fn permissions() -> Vec<Permission> {
        vec![
            Permission::new("1", "update", "You can update things"),
            Permission::new("2", "delete", "You can delete things"),
            Permission::new("3", "create", "You can create things"),
            Permission::new("4", "read", "You can read things"),
        ]
    }

    fn roles() -> Vec<Role> {
        vec![
            Role::new("1", "admin"),
            Role::new("2", "blogger"),
            Role::new("3", "manager"),
            Role::new("4", "sales"),
        ]
    }

    async fn scenario() -> Authorizer<MemoryStore> {
        let store = MemoryStore::new();
        for permission in permissions() {
            store.create_permission(&permission).await.unwrap();
        }
        for role in roles() {
            store.create_role(&role).await.unwrap();
        }
        store.assign_permission_to_role("1", "1").await.unwrap();

        Authorizer::new(store).await.unwrap()
    }

    fn update() -> Permission {
        Permission::new("1", "update", "")
    }

    fn delete() -> Permission {
        Permission::new("2", "delete", "")
    }

    #[tokio::test]
    async fn test_bootstrap_reflects_store() {
        let authz = scenario().await;

        assert_eq!(authz.permission_count().await, 4);
        assert_eq!(authz.role_count().await, 4);
        assert!(authz.granted("1", &update()).await);
        assert!(!authz.granted("1", &delete()).await);
        assert!(!authz.granted("2", &update()).await);
    }

    #[tokio::test]
    async fn test_granted_accepts_any_role_identity() {
        let authz = scenario().await;
        let admin = authz.role("1").await.unwrap();
        let user = User::new("ada@example.com", "", RoleRef::new("1", "admin"));

        assert!(authz.granted(&admin, &update()).await);
        assert!(authz.granted(&user, &update()).await);
        assert!(authz.granted(&RoleRef::new("1", "admin"), &update()).await);
        assert!(!authz.granted("missing", &update()).await);
    }

    #[tokio::test]
    async fn test_assign_then_revoke() {
        let authz = scenario().await;

        authz.assign_permission_to_role("2", &delete()).await.unwrap();
        assert!(authz.granted("2", &delete()).await);

        let err = authz
            .assign_permission_to_role("2", &delete())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(matches!(
            err,
            AuthzError::Assignment(CoreError::AlreadyAssigned { .. })
        ));

        authz
            .revoke_permission_from_role("2", &delete())
            .await
            .unwrap();
        assert!(!authz.granted("2", &delete()).await);
    }

    #[tokio::test]
    async fn test_revoke_twice_is_conflict() {
        let authz = scenario().await;

        authz
            .revoke_permission_from_role("1", &update())
            .await
            .unwrap();
        assert!(!authz.granted("1", &update()).await);

        let err = authz
            .revoke_permission_from_role("1", &update())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Assignment(CoreError::NotAssigned { .. })
        ));
        assert!(!authz.granted("1", &update()).await);
        assert!(authz.repo().get_grants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_role_mutates_nothing() {
        let authz = scenario().await;

        let err = authz
            .assign_permission_to_role("99", &delete())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::RoleNotFound(ref id) if id == "99"));
        assert_eq!(
            authz.repo().get_grants().await.unwrap(),
            vec![Grant::new("1", "1")]
        );
        assert!(!authz.has_role("99").await);
    }

    #[tokio::test]
    async fn test_unknown_permission_is_rejected() {
        let authz = scenario().await;

        let err = authz
            .assign_permission_to_role("2", &Permission::new("42", "publish", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::PermissionNotFound(_)));
        assert_eq!(authz.repo().get_grants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_role() {
        let authz = scenario().await;

        let editor = authz.create_role(Role::new("5", "editor")).await.unwrap();
        assert_eq!(editor.name(), "editor");
        assert!(authz.has_role("5").await);

        let err = authz.create_role(Role::new("5", "editor")).await.unwrap_err();
        assert!(matches!(err, AuthzError::RoleExists(_)));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_add_permission_tolerates_duplicates() {
        let authz = scenario().await;

        let stored = authz
            .add_permission(&Permission::new("4", "other label", ""))
            .await
            .unwrap();
        assert_eq!(stored.label(), "read");
        assert_eq!(authz.permission_count().await, 4);

        authz
            .add_permission(&Permission::new("5", "publish", ""))
            .await
            .unwrap();
        assert!(authz.has_permission("5").await);
        assert_eq!(authz.get_permissions().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_superadmin_gets_current_and_future_permissions() {
        let authz = scenario().await;

        let root = authz
            .create_super_admin(Role::new("root", "superadmin"))
            .await
            .unwrap();
        for permission in permissions() {
            assert!(authz.granted(&root, &permission).await);
        }

        let publish = Permission::new("5", "publish", "");
        authz.add_permission(&publish).await.unwrap();
        assert!(authz.granted("root", &publish).await);
        assert!(!authz.granted("1", &publish).await);
        assert!(!authz.granted("2", &publish).await);

        // Superadmin grants are not written as grant rows.
        assert_eq!(authz.repo().get_grants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_superadmin_grants_are_not_editable() {
        let authz = scenario().await;
        let root = authz
            .create_super_admin(Role::new("root", "superadmin"))
            .await
            .unwrap();
        let permissions = permissions();
        let update = &permissions[0];

        let err = authz
            .revoke_permission_from_role(&root, update)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::SuperadminGrants(ref id) if id == "root"));
        assert!(err.is_conflict());
        assert!(authz.granted(&root, update).await);

        let err = authz
            .assign_permission_to_role("root", update)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::SuperadminGrants(_)));
        assert_eq!(authz.repo().get_grants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_superadmin_reuses_cached_role() {
        let authz = scenario().await;
        let admin = authz.role("1").await.unwrap();

        let superadmin = authz
            .create_super_admin(Role::new("1", "admin"))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&admin, &superadmin));
        assert_eq!(superadmin.permission_count(), 4);
        assert_eq!(authz.role_count().await, 4);
    }

    #[tokio::test]
    async fn test_orphan_role_grant_is_fatal() {
        struct OrphanGrants(MemoryStore);

        #[async_trait::async_trait]
        impl AuthRepo for OrphanGrants {
            async fn get_permissions(&self) -> warden_store::Result<Vec<Permission>> {
                self.0.get_permissions().await
            }
            async fn get_permission(&self, p: &Permission) -> warden_store::Result<Option<Permission>> {
                self.0.get_permission(p).await
            }
            async fn create_permission(&self, p: &Permission) -> warden_store::Result<Permission> {
                self.0.create_permission(p).await
            }
            async fn get_roles(&self) -> warden_store::Result<Vec<Role>> {
                self.0.get_roles().await
            }
            async fn get_role(&self, r: &Role) -> warden_store::Result<Option<Role>> {
                self.0.get_role(r).await
            }
            async fn create_role(&self, r: &Role) -> warden_store::Result<Role> {
                self.0.create_role(r).await
            }
            async fn get_grants(&self) -> warden_store::Result<Vec<Grant>> {
                Ok(vec![Grant::new("ghost", "1")])
            }
            async fn assign_permission_to_role(&self, r: &str, p: &str) -> warden_store::Result<()> {
                self.0.assign_permission_to_role(r, p).await
            }
            async fn revoke_permission_from_role(&self, r: &str, p: &str) -> warden_store::Result<()> {
                self.0.revoke_permission_from_role(r, p).await
            }
        }

        let store = MemoryStore::new();
        store.create_permission(&update()).await.unwrap();

        let err = Authorizer::new(OrphanGrants(store)).await.err().unwrap();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            AuthzError::Bootstrap {
                stage: BootstrapStage::Grants,
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_grants_and_reads() {
        let authz = Arc::new(scenario().await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let authz = Arc::clone(&authz);
            handles.push(tokio::spawn(async move {
                let role = if i % 2 == 0 { "3" } else { "4" };
                let permission = Permission::new(((i / 2) % 4 + 1).to_string(), "", "");
                let _ = authz.assign_permission_to_role(role, &permission).await;
                authz.granted(role, &permission).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let grants = authz.repo().get_grants().await.unwrap();
        // Grant (1,1) from the scenario, plus 4 each for manager and sales.
        assert_eq!(grants.len(), 9);
        assert_eq!(authz.role("3").await.unwrap().permission_count(), 4);
    }
}
