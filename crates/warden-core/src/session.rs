//! Session: a per-client, expiring, dirty-tracked key/value store.
//!
//! A session moves through `fresh -> active -> expired`. Expiry is a pure
//! function of wall-clock time against the stored expiration; nothing fires
//! when it passes, and an expired session is never revived. The surrounding
//! service replaces it with a new one.
//!
//! The dirty flag records mutations since the last load or save. It is set by
//! [`Session::set`] and [`Session::delete`], and left untouched by
//! [`Session::replace_store`], which is how persisted contents are loaded.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};
use std::time::Duration;

use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::types::{expires_after, now_millis};

/// Session key under which the authenticated user id is bound.
pub const USER_ID_SESSION_KEY: &str = "userid";

/// Session lifetime used when none is configured.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(30 * 60);

/// The key/value contents of a session.
pub type SessionStore = HashMap<String, Value>;

/// A client session.
///
/// `Session::default()` is usable: its id is generated on first access and
/// its store is allocated on first write. Its expiration is the epoch, so it
/// reports itself expired.
#[derive(Default)]
pub struct Session {
    id: OnceLock<Uuid>,
    inner: RwLock<SessionInner>,
}

#[derive(Default)]
struct SessionInner {
    expires_at: i64,
    store: Option<SessionStore>,
    dirty: bool,
}

impl Session {
    /// Create a brand new session lasting `duration`.
    pub fn new(duration: Duration) -> Self {
        Self::restore(Uuid::new_v4(), expires_after(duration)).with_empty_store()
    }

    /// Rebuild a session handle from a persisted id and expiration.
    pub fn restore(id: Uuid, expires_at: i64) -> Self {
        Self {
            id: OnceLock::from(id),
            inner: RwLock::new(SessionInner {
                expires_at,
                store: None,
                dirty: false,
            }),
        }
    }

    /// Parse a textual session id and rebuild the handle.
    pub fn parse(id: &str, expires_at: i64) -> Result<Self> {
        let uuid = Uuid::parse_str(id).map_err(|_| CoreError::InvalidSessionId(id.to_string()))?;
        Ok(Self::restore(uuid, expires_at))
    }

    fn with_empty_store(self) -> Self {
        self.write().store = Some(SessionStore::new());
        self
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The session identity as a UUID.
    pub fn uuid(&self) -> Uuid {
        *self.id.get_or_init(Uuid::new_v4)
    }

    /// The session identity in its textual form.
    pub fn session_id(&self) -> String {
        self.uuid().to_string()
    }

    /// Expiration time (Unix ms).
    pub fn expires_at(&self) -> i64 {
        self.read().expires_at
    }

    /// True once the current time is past the expiration.
    pub fn expired(&self) -> bool {
        now_millis() > self.expires_at()
    }

    /// Push the expiration out to `duration` from now.
    pub fn renew(&self, duration: Duration) {
        self.write().expires_at = expires_after(duration);
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().store.as_ref().and_then(|s| s.get(key).cloned())
    }

    /// Write a value and mark the store dirty.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut inner = self.write();
        inner
            .store
            .get_or_insert_with(SessionStore::new)
            .insert(key.into(), value.into());
        inner.dirty = true;
    }

    /// Remove a value and mark the store dirty.
    pub fn delete(&self, key: &str) {
        let mut inner = self.write();
        if let Some(store) = inner.store.as_mut() {
            store.remove(key);
        }
        inner.dirty = true;
    }

    /// Snapshot of the current contents.
    pub fn store(&self) -> SessionStore {
        self.read().store.clone().unwrap_or_default()
    }

    /// True when something was set or deleted since the last load or save.
    pub fn store_dirty(&self) -> bool {
        self.read().dirty
    }

    /// Replace the whole store without marking it dirty.
    pub fn replace_store(&self, store: SessionStore) {
        let mut inner = self.write();
        inner.store = Some(store);
        inner.dirty = false;
    }

    /// Clear the dirty flag after the contents were persisted.
    pub fn mark_clean(&self) {
        self.write().dirty = false;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Session")
            .field("id", &self.uuid())
            .field("expires_at", &inner.expires_at)
            .field("keys", &inner.store.as_ref().map(|s| s.len()).unwrap_or(0))
            .field("dirty", &inner.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new(DEFAULT_SESSION_DURATION);

        assert!(Uuid::parse_str(&session.session_id()).is_ok());
        assert!(!session.expired());
        let remaining = session.expires_at() - now_millis();
        assert!(remaining <= 30 * 60 * 1000);
        assert!(remaining > 29 * 60 * 1000);
        assert!(session.store().is_empty());
        assert!(!session.store_dirty());
    }

    #[test]
    fn test_session_id_is_stable() {
        let session = Session::default();
        let first = session.session_id();
        assert_eq!(first, session.session_id());
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_session_expires_after_duration() {
        let session = Session::new(Duration::from_secs(2));
        assert!(!session.expired());

        thread::sleep(Duration::from_millis(2_100));
        assert!(session.expired());
    }

    #[test]
    fn test_get_set_delete() {
        let session = Session::new(DEFAULT_SESSION_DURATION);
        session.set("userid", 120);
        session.set("role", "admin");
        assert_eq!(session.store().len(), 2);
        assert_eq!(session.get("userid"), Some(json!(120)));

        session.delete("role");
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.get("role"), None);
    }

    #[test]
    fn test_default_session_allocates_store_lazily() {
        let session = Session::default();
        assert!(session.store().is_empty());
        assert!(!session.store_dirty());

        session.set("test", "foo");
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.get("test"), Some(json!("foo")));
    }

    #[test]
    fn test_delete_without_store_is_dirty() {
        let session = Session::default();
        session.delete("x");
        assert!(session.store_dirty());
        assert!(session.store().is_empty());

        let restored = Session::restore(Uuid::new_v4(), i64::MAX);
        restored.delete("userid");
        assert!(restored.store_dirty());
    }

    #[test]
    fn test_dirty_tracking() {
        let session = Session::new(DEFAULT_SESSION_DURATION);

        session.set("a", 1);
        assert!(session.store_dirty());

        let mut loaded = SessionStore::new();
        loaded.insert("b".into(), json!(true));
        session.replace_store(loaded);
        assert!(!session.store_dirty());
        assert_eq!(session.get("a"), None);
        assert_eq!(session.get("b"), Some(json!(true)));

        session.delete("b");
        assert!(session.store_dirty());

        session.mark_clean();
        assert!(!session.store_dirty());
    }

    #[test]
    fn test_renew_extends_expiration() {
        let session = Session::restore(Uuid::new_v4(), now_millis() - 1);
        assert!(session.expired());

        session.renew(Duration::from_secs(60));
        assert!(!session.expired());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Session::parse("not-a-uuid", 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSessionId(_)));
    }

    #[test]
    fn test_concurrent_writers() {
        let session = Arc::new(Session::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    session.set(format!("k{i}"), i);
                    assert_eq!(session.get(&format!("k{i}")), Some(json!(i)));
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(session.store().len(), 8);
        assert!(session.store_dirty());
    }
}
