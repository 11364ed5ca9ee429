//! Session configuration.

use std::time::Duration;

use serde::Deserialize;
use warden_core::DEFAULT_SESSION_DURATION;

/// How sessions are issued and carried.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in seconds, renewed on every update.
    pub ttl_secs: u64,

    /// Name of the cookie carrying the session token.
    pub cookie_name: String,

    pub cookie_path: String,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_DURATION.as_secs(),
            cookie_name: "warden_session".to_string(),
            cookie_path: "/".to_string(),
        }
    }
}
