//! # Warden Core
//!
//! Pure primitives for Warden: permissions, roles, sessions and users.
//!
//! This crate contains no I/O, no storage, no async. It is the in-memory
//! model that the authorizer caches and the session manager persists.
//!
//! ## Key Types
//!
//! - [`Permission`] - An immutable, identifiable capability token
//! - [`Role`] - A grant-holder owning a guarded set of permissions
//! - [`Grant`] - A `(role_id, permission_id)` pair as stored by a repository
//! - [`Session`] - An expiring, dirty-tracked key/value store for one client
//! - [`User`] - A stored account with a role reference
//!
//! ## Concurrency
//!
//! [`Role`] and [`Session`] carry their own locks, so they can be shared
//! behind an `Arc` and mutated from many threads without an outer guard.

pub mod error;
pub mod permission;
pub mod role;
pub mod session;
pub mod types;
pub mod user;

pub use error::{CoreError, Result};
pub use permission::Permission;
pub use role::{Grant, Role, RoleIdentity, RoleRef};
pub use session::{
    Session, SessionStore, DEFAULT_SESSION_DURATION, USER_ID_SESSION_KEY,
};
pub use types::{expires_after, now_millis};
pub use user::{Credentials, User};
