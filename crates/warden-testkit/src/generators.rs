//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use warden_core::{Grant, Permission, Role};

/// Generate a permission id.
pub fn permission_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9:_-]{0,15}".prop_map(String::from)
}

/// Generate a role id.
pub fn role_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}".prop_map(String::from)
}

/// A consistent set of permissions, roles and grants between them.
///
/// Ids are unique (permission ids case-insensitively) and every grant names
/// a generated role and permission.
#[derive(Debug, Clone)]
pub struct RbacUniverse {
    pub permissions: Vec<Permission>,
    pub role_ids: Vec<String>,
    pub grants: BTreeSet<Grant>,
}

impl RbacUniverse {
    pub fn roles(&self) -> Vec<Role> {
        self.role_ids
            .iter()
            .map(|id| Role::new(id.clone(), format!("role {id}")))
            .collect()
    }

    /// Whether `(role_id, permission_id)` is one of the generated grants.
    pub fn grants(&self, role_id: &str, permission_id: &str) -> bool {
        self.grants.contains(&Grant::new(role_id, permission_id))
    }
}

impl Arbitrary for RbacUniverse {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::btree_set(permission_id(), 0..12),
            prop::collection::btree_set(role_id(), 0..8),
        )
            .prop_flat_map(|(permission_ids, role_ids)| {
                // Case-insensitive uniqueness for permission ids.
                let mut seen = BTreeSet::new();
                let permission_ids: Vec<String> = permission_ids
                    .into_iter()
                    .filter(|id| seen.insert(Permission::key_for(id)))
                    .collect();
                let role_ids: Vec<String> = role_ids.into_iter().collect();

                let pairs: Vec<Grant> = role_ids
                    .iter()
                    .flat_map(|r| permission_ids.iter().map(move |p| Grant::new(r.clone(), p.clone())))
                    .collect();
                let mask = prop::collection::vec(any::<bool>(), pairs.len());

                (Just(permission_ids), Just(role_ids), Just(pairs), mask)
            })
            .prop_map(|(permission_ids, role_ids, pairs, mask)| RbacUniverse {
                permissions: permission_ids
                    .into_iter()
                    .map(|id| Permission::new(id.clone(), id, ""))
                    .collect(),
                role_ids,
                grants: pairs
                    .into_iter()
                    .zip(mask)
                    .filter_map(|(grant, keep)| keep.then_some(grant))
                    .collect(),
            })
            .boxed()
    }
}
