//! Permission: an immutable capability token.
//!
//! A permission is identified by its `id`. Label and description are opaque
//! to authorization logic; they exist for administrators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable, identifiable capability.
///
/// Equality and hashing are identity-based and case-insensitive on the id, so
/// `"Update"` and `"update"` name the same permission.
#[derive(Clone, Serialize, Deserialize)]
pub struct Permission {
    id: String,
    label: String,
    description: String,
}

impl Permission {
    /// Create a permission with an explicit id.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
        }
    }

    /// The stable identity of this permission.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// True iff `other` has the same identity, ignoring case.
    pub fn equals(&self, other: &Permission) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
    }

    /// The key this permission is indexed under in permission sets.
    pub fn key(&self) -> String {
        Self::key_for(&self.id)
    }

    /// Normalize a raw permission id into a set key.
    pub fn key_for(id: &str) -> String {
        id.to_ascii_lowercase()
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for Permission {}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permission({}:{})", self.id, self.label)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
