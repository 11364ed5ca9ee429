//! # Warden Authz
//!
//! The RBAC authorization cache.
//!
//! ## Overview
//!
//! An [`Authorizer`] loads every permission, role and grant from an
//! [`AuthRepo`](warden_store::AuthRepo) once at construction, then answers
//! "does role R hold permission P?" from memory. It is constructed
//! explicitly and shared behind an `Arc`; there is no global instance.
//!
//! ## Writes
//!
//! Every mutation writes to the repository first and touches the cache only
//! on success. The two steps are not transactional: if the repository write
//! succeeds but the cache refuses it, the caller gets
//! [`AuthzError::CacheDiverged`] naming the grant.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_authz::Authorizer;
//! use warden_core::Permission;
//! use warden_store::MemoryStore;
//!
//! async fn example() {
//!     let authz = Authorizer::new(MemoryStore::new()).await.unwrap();
//!     let update = authz
//!         .add_permission(&Permission::new("update", "update", "You can update things"))
//!         .await
//!         .unwrap();
//!
//!     assert!(!authz.granted("admin", &update).await);
//! }
//! ```

pub mod authorizer;
pub mod error;

pub use authorizer::Authorizer;
pub use error::{AuthzError, BootstrapStage, Result};
