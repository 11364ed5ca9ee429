//! # Warden Testkit
//!
//! Testing utilities for Warden.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: The canonical permission/role scenario and a seeded store
//! - **Fault injection**: [`FaultyRepo`], an `AuthRepo` wrapper that counts
//!   calls and fails on demand
//! - **Generators**: Proptest strategies for consistent RBAC universes
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use warden_testkit::fixtures::{permission, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::seeded().await;
//!     let authz = fixture.authorizer().await;
//!     assert!(authz.granted("1", &permission("update")).await);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use warden_testkit::RbacUniverse;
//!
//! proptest! {
//!     #[test]
//!     fn every_grant_is_cached(universe: RbacUniverse) {
//!         // seed a store from `universe`, bootstrap, compare
//!     }
//! }
//! ```

pub mod faulty;
pub mod fixtures;
pub mod generators;

pub use faulty::{FaultyRepo, RepoOp};
pub use fixtures::{seed_scenario, TestFixture};
pub use generators::RbacUniverse;
