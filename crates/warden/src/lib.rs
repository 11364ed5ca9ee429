//! # Warden
//!
//! In-process authorization and session management for request-handling
//! services.
//!
//! ## Overview
//!
//! - **Authorization**: an in-memory RBAC cache answering "does role R hold
//!   permission P?" without touching storage on the read path
//! - **Authentication**: Argon2id password verification and binding of the
//!   authenticated user to a session
//! - **Sessions**: expiring, dirty-tracked key/value stores identified to the
//!   client by a sealed token
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden::{Warden, WardenConfig};
//! use warden::core::{Credentials, Permission, Role};
//! use warden::session::carrier::memory::MemoryCarrier;
//!
//! async fn example() {
//!     let config = WardenConfig::from_json(r#"{ "token_secret": "change me" }"#).unwrap();
//!     let warden = Warden::open_sqlite(config).await.unwrap();
//!
//!     let update = Permission::new("update", "update", "You can update things");
//!     warden.authorizer().add_permission(&update).await.unwrap();
//!     warden.authorizer().create_role(Role::new("admin", "admin")).await.unwrap();
//!     warden
//!         .authorizer()
//!         .assign_permission_to_role("admin", &update)
//!         .await
//!         .unwrap();
//!
//!     // Per request
//!     let mut carrier = MemoryCarrier::new();
//!     let session = warden.sessions().get_session(&carrier).await.unwrap();
//!     warden
//!         .authenticator()
//!         .login(&session, &Credentials::new("ada@example.com", "hunter2"))
//!         .await
//!         .unwrap();
//!     warden.sessions().update_session(&session).await.unwrap();
//!     warden.sessions().write_cookie(&mut carrier, &session).unwrap();
//!
//!     let allowed = warden.authorize_session(&session, &update).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `warden::core` - Permission, Role, Session, User
//! - `warden::store` - Repository traits, SQLite and in-memory stores
//! - `warden::authz` - The authorization cache
//! - `warden::session` - Token codec, carriers and the session manager

pub mod authenticator;
pub mod config;
pub mod error;
pub mod password;
pub mod warden;

// Re-export component crates
pub use warden_authz as authz;
pub use warden_core as core;
pub use warden_session as session;
pub use warden_store as store;

pub use crate::warden::Warden;
pub use authenticator::Authenticator;
pub use config::WardenConfig;
pub use error::{AuthError, Result, WardenError};
pub use password::{Argon2Hasher, PasswordHasher};

// Re-export commonly used types
pub use warden_authz::{Authorizer, AuthzError};
pub use warden_core::{Credentials, Permission, Role, RoleRef, Session, User};
pub use warden_session::{SessionConfig, SessionManager};
