//! Data written through one `SqliteStore` survives reopening the file.

use std::time::Duration;

use warden_core::{expires_after, now_millis, Grant, Permission, Role, Session, SessionStore};
use warden_store::{AuthRepo, SessionRecord, SessionRepo, SqliteStore};

#[tokio::test]
async fn test_grants_and_sessions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.db");

    let session = Session::new(Duration::from_secs(600));
    {
        let store = SqliteStore::open(&path).unwrap();
        store
            .create_permission(&Permission::new("update", "update", "You can update things"))
            .await
            .unwrap();
        store.create_role(&Role::new("admin", "admin")).await.unwrap();
        store
            .assign_permission_to_role("admin", "update")
            .await
            .unwrap();

        let mut contents = SessionStore::new();
        contents.insert("userid".into(), 7.into());
        store
            .insert_session(&SessionRecord {
                id: session.uuid(),
                expires_at: expires_after(Duration::from_secs(600)),
                contents: Some(contents),
            })
            .await
            .unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.get_permissions().await.unwrap().len(), 1);
    assert_eq!(store.get_roles().await.unwrap()[0].name(), "admin");
    assert_eq!(
        store.get_grants().await.unwrap(),
        vec![Grant::new("admin", "update")]
    );

    let restored = store
        .load_session(&session.uuid(), now_millis())
        .await
        .unwrap()
        .unwrap()
        .into_session();
    assert_eq!(restored.session_id(), session.session_id());
    assert_eq!(restored.get("userid"), Some(7.into()));
    assert!(!restored.store_dirty());
}

#[tokio::test]
async fn test_reopen_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.db");

    SqliteStore::open(&path).unwrap();
    let store = SqliteStore::open(&path).unwrap();

    store
        .create_permission(&Permission::new("read", "read", ""))
        .await
        .unwrap();
    assert!(store
        .create_permission(&Permission::new("READ", "read", ""))
        .await
        .unwrap_err()
        .is_duplicate());
}
