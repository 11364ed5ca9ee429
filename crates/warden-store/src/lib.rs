//! # Warden Store
//!
//! Storage abstraction for Warden. The authorizer, authenticator and session
//! manager only talk to the repository traits defined here, so the backing
//! store can be swapped without touching them.
//!
//! ## Key Types
//!
//! - [`AuthRepo`] - Permissions, roles and role/permission grants
//! - [`UserAuthRepo`] - Users looked up by credentials or by session
//! - [`SessionRepo`] - Persisted session records
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_core::Permission;
//! use warden_store::{AuthRepo, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("warden.db").unwrap();
//!
//!     let update = Permission::new("update", "update", "You can update things");
//!     store.create_permission(&update).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Duplicate detection**: inserting an existing permission, role or grant
//!   returns [`StoreError::Duplicate`], distinguishable from other failures
//! - **Missing rows**: revoking a grant that does not exist returns
//!   [`StoreError::NotFound`]
//! - **Unexpired reads**: [`SessionRepo::load_session`] never returns an
//!   expired record

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuthRepo, SessionRecord, SessionRepo, UserAuthRepo};
