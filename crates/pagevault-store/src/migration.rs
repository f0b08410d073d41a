//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use pagevault_core::now_millis;

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
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
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
        tracing::debug!(from = current, to = CURRENT_VERSION, "database migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
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
        -- Protected documents, written once by the encryption pipeline
        CREATE TABLE documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            page_count INTEGER NOT NULL,
            wrapped_key TEXT NOT NULL,         -- base64 nonce(12) || tag(16) || ciphertext
            created_at INTEGER NOT NULL        -- Unix ms
        );

        -- Storefront-owned access rights
        CREATE TABLE entitlements (
            user_id INTEGER NOT NULL,
            document_id INTEGER NOT NULL,
            expires_at INTEGER,                -- Unix ms, NULL = never
            PRIMARY KEY (user_id, document_id)
        );

        -- Append-only page access log
        CREATE TABLE access_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            document_id INTEGER NOT NULL,
            page INTEGER NOT NULL,
            ip TEXT NOT NULL,                  -- truncated to 64 chars
            user_agent TEXT NOT NULL,          -- truncated to 180 chars
            accessed_at INTEGER NOT NULL
        );

        -- Shared fixed-window rate limit counters
        CREATE TABLE rate_limits (
            key TEXT PRIMARY KEY,
            count INTEGER NOT NULL,
            reset_at INTEGER NOT NULL
        );

        CREATE INDEX idx_access_log_document ON access_log(document_id, accessed_at);
        CREATE INDEX idx_rate_limits_reset ON rate_limits(reset_at);
        "#,
    )?;

    Ok(())
}
