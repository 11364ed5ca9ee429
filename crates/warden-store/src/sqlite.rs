//! SQLite implementation of the repository traits.
//!
//! This is the primary storage backend for Warden. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{ffi, params, Connection, OptionalExtension};
use uuid::Uuid;

use warden_core::{Credentials, Grant, Permission, Role, RoleRef, Session, SessionStore, User};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{bound_user_id, AuthRepo, SessionRecord, SessionRepo, UserAuthRepo};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Translate constraint violations into the store's conflict errors.
fn classify(err: rusqlite::Error, subject: impl FnOnce() -> String) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return StoreError::Duplicate(subject());
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::NotFound(subject()),
            _ => {}
        }
    }
    StoreError::Database(err)
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Permission> {
    Ok(Permission::new(
        row.get::<_, String>("permission_id")?,
        row.get::<_, String>("label")?,
        row.get::<_, String>("description")?,
    ))
}

fn row_to_role(row: &rusqlite::Row<'_>) -> rusqlite::Result<Role> {
    let id: String = row.get("role_id")?;
    let name: String = row.get("role_name")?;
    Ok(Role::new(id, name).with_created_at(row.get("created_at")?))
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("user_id")?,
        email: row.get("email")?,
        password_hash: row.get("password")?,
        role: RoleRef::new(
            row.get::<_, String>("role_id")?,
            row.get::<_, String>("role_name")?,
        ),
        created: row.get("created")?,
        modified: row.get("modified")?,
        last_login: row.get("last_login")?,
    })
}

const USER_COLUMNS: &str = "u.user_id, u.email, u.password, u.role_id, r.role_name,
                            u.created, u.modified, u.last_login
                            FROM users u JOIN roles r ON r.role_id = u.role_id";

fn encode_contents(contents: &SessionStore) -> Result<String> {
    Ok(serde_json::to_string(contents)?)
}

fn decode_record(id: String, expires_at: i64, contents: Option<String>) -> Result<SessionRecord> {
    let id = Uuid::parse_str(&id)
        .map_err(|e| StoreError::InvalidData(format!("session id {}: {}", id, e)))?;
    let contents = contents
        .map(|json| serde_json::from_str::<SessionStore>(&json))
        .transpose()?;

    Ok(SessionRecord {
        id,
        expires_at,
        contents,
    })
}

#[async_trait]
impl AuthRepo for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_permissions(&self) -> Result<Vec<Permission>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT permission_id, label, description FROM permissions ORDER BY permission_id",
            )?;
            let permissions = stmt
                .query_map([], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(permissions)
        })
        .await
    }

    async fn get_permission(&self, permission: &Permission) -> Result<Option<Permission>> {
        let id = permission.id().to_string();

        self.run(move |conn| {
            conn.query_row(
                "SELECT permission_id, label, description FROM permissions
                 WHERE permission_id = ?1",
                params![id],
                row_to_permission,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn create_permission(&self, permission: &Permission) -> Result<Permission> {
        let permission = permission.clone();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO permissions (permission_id, label, description) VALUES (?1, ?2, ?3)",
                params![permission.id(), permission.label(), permission.description()],
            )
            .map_err(|e| classify(e, || format!("permission {}", permission.id())))?;
            Ok(permission)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_roles(&self) -> Result<Vec<Role>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare("SELECT role_id, role_name, created_at FROM roles ORDER BY role_id")?;
            let roles = stmt
                .query_map([], row_to_role)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(roles)
        })
        .await
    }

    async fn get_role(&self, role: &Role) -> Result<Option<Role>> {
        let id = role.id().to_string();

        self.run(move |conn| {
            conn.query_row(
                "SELECT role_id, role_name, created_at FROM roles WHERE role_id = ?1",
                params![id],
                row_to_role,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn create_role(&self, role: &Role) -> Result<Role> {
        let (id, name, created_at) = (role.id().to_string(), role.name().to_string(), role.created_at());

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO roles (role_id, role_name, created_at) VALUES (?1, ?2, ?3)",
                params![id, name, created_at],
            )
            .map_err(|e| classify(e, || format!("role {}", id)))?;
            Ok(Role::new(id, name).with_created_at(created_at))
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_grants(&self) -> Result<Vec<Grant>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT rp.role_id, p.permission_id
                 FROM role_permissions rp
                 JOIN permissions p ON p.permission_id = rp.permission_id
                 ORDER BY rp.role_id, p.permission_id",
            )?;
            let grants = stmt
                .query_map([], |row| Ok(Grant::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(grants)
        })
        .await
    }

    async fn assign_permission_to_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        let grant = Grant::new(role_id, permission_id);

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                params![grant.role_id, grant.permission_id],
            )
            .map_err(|e| {
                classify(e, || {
                    format!("grant ({}, {})", grant.role_id, grant.permission_id)
                })
            })?;
            Ok(())
        })
        .await
    }

    async fn revoke_permission_from_role(&self, role_id: &str, permission_id: &str) -> Result<()> {
        let grant = Grant::new(role_id, permission_id);

        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
                params![grant.role_id, grant.permission_id],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound(format!(
                    "grant ({}, {})",
                    grant.role_id, grant.permission_id
                )));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl UserAuthRepo for SqliteStore {
    async fn get_user_by_credentials(&self, credentials: &Credentials) -> Result<Option<User>> {
        let username = credentials.username.clone();

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} WHERE u.email = ?1", USER_COLUMNS),
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_user_from_session(&self, session: &Session) -> Result<User> {
        let user_id = bound_user_id(session)?;

        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} WHERE u.user_id = ?1", USER_COLUMNS),
                params![user_id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
        })
        .await
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        let user = user.clone();

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (email, password, role_id, created, modified, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.email,
                    user.password_hash,
                    user.role.id,
                    user.created,
                    user.modified,
                    user.last_login
                ],
            )
            .map_err(|e| classify(e, || format!("user {}", user.email)))?;

            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {} WHERE u.user_id = ?1", USER_COLUMNS),
                params![id],
                row_to_user,
            )
            .map_err(StoreError::from)
        })
        .await
    }
}

#[async_trait]
impl SessionRepo for SqliteStore {
    async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();

        self.run(move |conn| {
            let contents = record.contents.as_ref().map(encode_contents).transpose()?;
            conn.execute(
                "INSERT INTO sessions (session_id, expires_at, contents) VALUES (?1, ?2, ?3)",
                params![record.id.to_string(), record.expires_at, contents],
            )
            .map_err(|e| classify(e, || format!("session {}", record.id)))?;
            Ok(())
        })
        .await
    }

    async fn load_session(&self, id: &Uuid, now: i64) -> Result<Option<SessionRecord>> {
        let id = *id;

        let row = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT session_id, expires_at, contents FROM sessions
                     WHERE session_id = ?1 AND expires_at >= ?2",
                    params![id.to_string(), now],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        row.map(|(id, expires_at, contents)| decode_record(id, expires_at, contents))
            .transpose()
    }

    async fn update_session(
        &self,
        id: &Uuid,
        expires_at: i64,
        contents: Option<&SessionStore>,
    ) -> Result<()> {
        let id = *id;
        let contents = contents.map(encode_contents).transpose()?;

        self.run(move |conn| {
            let changed = match contents {
                Some(json) => conn.execute(
                    "UPDATE sessions SET expires_at = ?2, contents = ?3 WHERE session_id = ?1",
                    params![id.to_string(), expires_at, json],
                )?,
                None => conn.execute(
                    "UPDATE sessions SET expires_at = ?2 WHERE session_id = ?1",
                    params![id.to_string(), expires_at],
                )?,
            };

            if changed == 0 {
                return Err(StoreError::NotFound(format!("session {}", id)));
            }
            Ok(())
        })
        .await
    }

    async fn delete_session(&self, id: &Uuid) -> Result<()> {
        let id = *id;

        self.run(move |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                params![id.to_string()],
            )?;
            Ok(())
        })
        .await
    }
}
