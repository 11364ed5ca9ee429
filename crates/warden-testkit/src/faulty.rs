//! A repository wrapper that fails on demand.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use warden_core::{Grant, Permission, Role};
use warden_store::{AuthRepo, Result, StoreError};

/// An [`AuthRepo`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    GetPermissions,
    GetPermission,
    CreatePermission,
    GetRoles,
    GetRole,
    CreateRole,
    GetGrants,
    Assign,
    Revoke,
}

#[derive(Default)]
struct Faults {
    failing: HashSet<RepoOp>,
    calls: HashMap<RepoOp, usize>,
    extra_grants: Vec<Grant>,
    blind_grants: bool,
}

/// Wraps an [`AuthRepo`], counting calls and injecting failures.
pub struct FaultyRepo<R> {
    inner: R,
    faults: Mutex<Faults>,
}

impl<R: AuthRepo> FaultyRepo<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Make every later call to `op` fail with [`StoreError::InvalidData`].
    pub fn fail(&self, op: RepoOp) -> &Self {
        self.faults().failing.insert(op);
        self
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: RepoOp) -> &Self {
        self.faults().failing.remove(&op);
        self
    }

    /// Report `grant` from [`AuthRepo::get_grants`] in addition to the stored ones.
    pub fn with_extra_grant(self, grant: Grant) -> Self {
        self.faults().extra_grants.push(grant);
        self
    }

    /// Accept every assign and revoke without consulting the inner store,
    /// as a backend without grant constraints would.
    pub fn with_blind_grants(self) -> Self {
        self.faults().blind_grants = true;
        self
    }

    /// How many times `op` has been called.
    pub fn calls(&self, op: RepoOp) -> usize {
        self.faults().calls.get(&op).copied().unwrap_or(0)
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, op: RepoOp) -> Result<()> {
        let mut faults = self.faults();
        *faults.calls.entry(op).or_default() += 1;

        if faults.failing.contains(&op) {
            return Err(StoreError::InvalidData(format!("injected failure in {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: AuthRepo> AuthRepo for FaultyRepo<R> {
    async fn get_permissions(&self) -> Result<Vec<Permission>> {
        self.enter(RepoOp::GetPermissions)?;
        self.inner.get_permissions().await
    }

    async fn get_permission(&self, permission: &Permission) -> Result<Option<Permission>> {
        self.enter(RepoOp::GetPermission)?;
        self.inner.get_permission(permission).await
    }

    async fn create_permission(&self, permission: &Permission) -> Result<Permission> {
        self.enter(RepoOp::CreatePermission)?;
        self.inner.create_permission(permission).await
    }

    async fn get_roles(&self) -> Result<Vec<Role>> {
        self.enter(RepoOp::GetRoles)?;
        self.inner.get_roles().await
    }

    async fn get_role(&self, role: &Role) -> Result<Option<Role>> {
        self.enter(RepoOp::GetRole)?;
        self.inner.get_role(role).await
    }

    async fn create_role(&self, role: &Role) -> Result<Role> {
        self.enter(RepoOp::CreateRole)?;
        self.inner.create_role(role).await
    }

    async fn get_grants(&self) -> Result<Vec<Grant>> {
        self.enter(RepoOp::GetGrants)?;
        let mut grants = self.inner.get_grants().await?;
        grants.extend(self.faults().extra_grants.iter().cloned());
        Ok(grants)
    }

    async fn assign_permission_to_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        self.enter(RepoOp::Assign)?;
        if self.faults().blind_grants {
            return Ok(());
        }
        self.inner
            .assign_permission_to_role(role_id, permission_id)
            .await
    }

    async fn revoke_permission_from_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        self.enter(RepoOp::Revoke)?;
        if self.faults().blind_grants {
            return Ok(());
        }
        self.inner
            .revoke_permission_from_role(role_id, permission_id)
            .await
    }
}
