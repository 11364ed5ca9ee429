//! Carrying session tokens in and out of requests.
//!
//! Warden does not depend on an HTTP stack. A [`Carrier`] is whatever the
//! caller uses to read the incoming token and to emit outgoing cookies.

use std::fmt;

use warden_core::now_millis;

use crate::config::SessionConfig;

/// A request/response pair as seen by the session manager.
pub trait Carrier {
    /// The incoming token stored under `name`, if any.
    fn read_token(&self, name: &str) -> Option<String>;

    /// Queue an outgoing cookie.
    fn write_cookie(&mut self, cookie: Cookie);
}

/// An outgoing cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub http_only: bool,
    /// Lifetime in seconds; `0` tells the client to drop the cookie.
    pub max_age: i64,
}

impl Cookie {
    /// A cookie carrying `token` until `expires_at` (Unix ms).
    pub fn session(config: &SessionConfig, token: String, expires_at: i64) -> Self {
        let remaining_ms = expires_at.saturating_sub(now_millis()).max(0);
        Self {
            name: config.cookie_name.clone(),
            value: token,
            path: config.cookie_path.clone(),
            http_only: true,
            max_age: remaining_ms.saturating_add(999) / 1000,
        }
    }

    /// A cookie that clears the session token on the client.
    pub fn invalidation(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            value: String::new(),
            path: config.cookie_path.clone(),
            http_only: true,
            max_age: 0,
        }
    }

    pub fn is_invalidation(&self) -> bool {
        self.max_age <= 0
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}; Max-Age={}", self.name, self.value, self.path, self.max_age)?;
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        Ok(())
    }
}

/// In-memory carrier for tests and embedding.
pub mod memory {
    use std::collections::HashMap;

    use super::{Carrier, Cookie};

    /// Holds incoming tokens and records every cookie written.
    #[derive(Debug, Default, Clone)]
    pub struct MemoryCarrier {
        incoming: HashMap<String, String>,
        written: Vec<Cookie>,
    }

    impl MemoryCarrier {
        pub fn new() -> Self {
            Self::default()
        }

        /// A carrier presenting `token` under `name`.
        pub fn with_token(name: impl Into<String>, token: impl Into<String>) -> Self {
            let mut carrier = Self::new();
            carrier.incoming.insert(name.into(), token.into());
            carrier
        }

        /// Cookies written so far, oldest first.
        pub fn written(&self) -> &[Cookie] {
            &self.written
        }

        /// The most recent cookie written under `name`.
        pub fn last_cookie(&self, name: &str) -> Option<&Cookie> {
            self.written.iter().rev().find(|cookie| cookie.name == name)
        }

        /// The carrier for the client's next request: incoming tokens updated
        /// with the cookies written here, invalidated ones dropped.
        pub fn next_request(&self) -> Self {
            let mut incoming = self.incoming.clone();
            for cookie in &self.written {
                if cookie.is_invalidation() {
                    incoming.remove(&cookie.name);
                } else {
                    incoming.insert(cookie.name.clone(), cookie.value.clone());
                }
            }
            Self {
                incoming,
                written: Vec::new(),
            }
        }
    }

    impl Carrier for MemoryCarrier {
        fn read_token(&self, name: &str) -> Option<String> {
            self.incoming.get(name).cloned()
        }

        fn write_cookie(&mut self, cookie: Cookie) {
            self.written.push(cookie);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryCarrier;
    use super::*;
    use warden_core::expires_after;

    #[test]
    fn test_session_cookie_header() {
        let config = SessionConfig::default();
        let cookie = Cookie::session(
            &config,
            "abc".into(),
            expires_after(std::time::Duration::from_secs(1800)),
        );

        assert!(cookie.max_age > 1790 && cookie.max_age <= 1800);
        let header = cookie.to_header_value();
        assert!(header.starts_with("warden_session=abc; Path=/; Max-Age="));
        assert!(header.ends_with("; HttpOnly"));
    }

    #[test]
    fn test_invalidation_cookie() {
        let cookie = Cookie::invalidation(&SessionConfig::default());
        assert!(cookie.is_invalidation());
        assert_eq!(
            cookie.to_header_value(),
            "warden_session=; Path=/; Max-Age=0; HttpOnly"
        );
    }

    #[test]
    fn test_memory_carrier_replays_cookies() {
        let config = SessionConfig::default();
        let mut carrier = MemoryCarrier::new();
        carrier.write_cookie(Cookie::session(&config, "t1".into(), i64::MAX));

        assert_eq!(carrier.written().len(), 1);

        let next = carrier.next_request();
        assert!(next.written().is_empty());
        assert_eq!(next.read_token("warden_session").as_deref(), Some("t1"));

        let mut next = next;
        next.write_cookie(Cookie::invalidation(&config));
        assert_eq!(next.next_request().read_token("warden_session"), None);
    }
}
