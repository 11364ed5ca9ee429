//! Warden configuration.

use std::path::PathBuf;

use serde::Deserialize;
use warden_session::SessionConfig;

use crate::error::{Result, WardenError};

/// Top-level configuration.
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Session lifetime and cookie settings.
    pub session: SessionConfig,

    /// Secret the token sealing key is derived from. When unset, a random
    /// key is used and tokens do not survive a restart.
    pub token_secret: Option<String>,

    /// SQLite database file. When unset, an in-memory database is used.
    pub database_path: Option<PathBuf>,
}

impl WardenConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| WardenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session.ttl_secs == 0 {
            return Err(WardenError::Config("session.ttl_secs must be positive".into()));
        }
        if self.session.cookie_name.is_empty() {
            return Err(WardenError::Config("session.cookie_name must not be empty".into()));
        }
        if matches!(&self.token_secret, Some(secret) if secret.is_empty()) {
            return Err(WardenError::Config("token_secret must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = WardenConfig::from_json("{}").unwrap();
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.session.ttl_secs, 30 * 60);
        assert_eq!(config.session.cookie_name, "warden_session");
        assert!(config.token_secret.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config = WardenConfig::from_json(
            r#"{ "session": { "ttl_secs": 120 }, "token_secret": "s3cret", "database_path": "/tmp/w.db" }"#,
        )
        .unwrap();

        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.session.cookie_path, "/");
        assert_eq!(config.token_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/w.db")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(WardenConfig::from_json(r#"{ "session": { "ttl_secs": 0 } }"#).is_err());
        assert!(WardenConfig::from_json(r#"{ "token_secret": "" }"#).is_err());
        assert!(WardenConfig::from_json("not json").is_err());
    }
}
