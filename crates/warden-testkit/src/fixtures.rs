//! Test fixtures and helpers.
//!
//! The canonical scenario used across Warden's tests: four permissions
//! (update, delete, create, read with ids 1-4), four roles (admin, blogger,
//! manager, sales with ids 1-4), and a single grant of update to admin.

use std::sync::Arc;

use warden_authz::Authorizer;
use warden_core::{Grant, Permission, Role};
use warden_session::{SealedTokenCodec, SessionConfig, SessionManager};
use warden_store::{AuthRepo, MemoryStore};

/// The scenario's permissions.
pub fn scenario_permissions() -> Vec<Permission> {
    vec![
        Permission::new("1", "update", "You can update things"),
        Permission::new("2", "delete", "You can delete things"),
        Permission::new("3", "create", "You can create things"),
        Permission::new("4", "read", "You can read things"),
    ]
}

/// The scenario's roles, without grants.
pub fn scenario_roles() -> Vec<Role> {
    vec![
        Role::new("1", "admin"),
        Role::new("2", "blogger"),
        Role::new("3", "manager"),
        Role::new("4", "sales"),
    ]
}

/// The scenario's stored grants.
pub fn scenario_grants() -> Vec<Grant> {
    vec![Grant::new("1", "1")]
}

/// Look up a scenario permission by label.
///
/// # Panics
///
/// Panics if `label` is not one of the scenario labels.
pub fn permission(label: &str) -> Permission {
    scenario_permissions()
        .into_iter()
        .find(|p| p.label() == label)
        .unwrap_or_else(|| panic!("no scenario permission labelled {label}"))
}

/// Write the scenario into `repo`.
pub async fn seed_scenario<R: AuthRepo + ?Sized>(repo: &R) -> warden_store::Result<()> {
    for permission in scenario_permissions() {
        repo.create_permission(&permission).await?;
    }
    for role in scenario_roles() {
        repo.create_role(&role).await?;
    }
    for grant in scenario_grants() {
        repo.assign_permission_to_role(&grant.role_id, &grant.permission_id)
            .await?;
    }
    Ok(())
}

/// A memory store holding the canonical scenario.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// A store seeded with the scenario.
    pub async fn seeded() -> Self {
        let fixture = Self::new();
        seed_scenario(fixture.store.as_ref())
            .await
            .expect("seeding a fresh memory store cannot fail");
        fixture
    }

    /// An authorizer loaded from this fixture's store.
    pub async fn authorizer(&self) -> Authorizer<Arc<MemoryStore>> {
        Authorizer::new(Arc::clone(&self.store))
            .await
            .expect("bootstrap from a memory store cannot fail")
    }

    /// A session manager over this fixture's store with a fixed secret.
    pub fn session_manager(&self, config: SessionConfig) -> SessionManager<Arc<MemoryStore>> {
        let codec = SealedTokenCodec::new(b"warden-testkit", config.cookie_name.clone());
        SessionManager::new(Arc::clone(&self.store), codec, config)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
