//! Users and login credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::role::{RoleIdentity, RoleRef};
use crate::types::now_millis;

/// A stored account.
///
/// Produced by a user repository and consumed read-only by the authenticator.
/// `password_hash` holds a one-way digest, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    pub role: RoleRef,
    pub created: i64,
    pub modified: i64,
    pub last_login: i64,
}

impl User {
    /// Create an unsaved user (id 0) with the given role.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, role: RoleRef) -> Self {
        let now = now_millis();
        Self {
            id: 0,
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            created: now,
            modified: now,
            last_login: 0,
        }
    }

    /// The username used for login.
    pub fn username(&self) -> &str {
        &self.email
    }
}

impl RoleIdentity for User {
    fn role_id(&self) -> &str {
        &self.role.id
    }
}

/// A username/password pair supplied by a login attempt.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
