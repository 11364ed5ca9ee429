//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;
use warden_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "migrated warden schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE permissions (
            permission_id TEXT PRIMARY KEY COLLATE NOCASE,
            label TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE roles (
            role_id TEXT PRIMARY KEY,
            role_name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Grants: one row per (role, permission)
        CREATE TABLE role_permissions (
            role_id TEXT NOT NULL REFERENCES roles(role_id),
            permission_id TEXT NOT NULL COLLATE NOCASE REFERENCES permissions(permission_id),
            PRIMARY KEY (role_id, permission_id)
        );

        CREATE TABLE users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password TEXT NOT NULL,
            role_id TEXT NOT NULL REFERENCES roles(role_id),
            created INTEGER NOT NULL,
            modified INTEGER NOT NULL,
            last_login INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE sessions (
            session_id TEXT PRIMARY KEY,
            expires_at INTEGER NOT NULL,
            contents TEXT              -- JSON object, NULL until first save
        );

        CREATE INDEX idx_role_permissions_permission ON role_permissions(permission_id);
        CREATE INDEX idx_users_role ON users(role_id);
        CREATE INDEX idx_sessions_expires ON sessions(expires_at);
        "#,
    )?;

    Ok(())
}
