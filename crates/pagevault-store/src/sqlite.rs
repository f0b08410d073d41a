//! SQLite implementation of the Store trait.
//!
//! This is the primary metadata backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use pagevault_core::{
    now_millis, AccessLogEntry, Document, DocumentId, Entitlement, NewDocument, RateLimitPolicy,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::limiter::SqliteRateLimiter;
use crate::migration;
use crate::traits::Store;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A rate limiter whose counters live in this database.
    ///
    /// Processes that open the same database file share limits.
    pub fn rate_limiter(&self, policy: RateLimitPolicy) -> SqliteRateLimiter {
        SqliteRateLimiter::new(self.conn.clone(), policy)
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// Helper to convert a row to Document
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: DocumentId(row.get("id")?),
        title: row.get("title")?,
        page_count: row.get("page_count")?,
        wrapped_key: row.get("wrapped_key")?,
        created_at: row.get("created_at")?,
    })
}

// Helper to convert a row to AccessLogEntry
fn row_to_access(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessLogEntry> {
    Ok(AccessLogEntry {
        user_id: UserId(row.get("user_id")?),
        document_id: DocumentId(row.get("document_id")?),
        page: row.get("page")?,
        ip: row.get("ip")?,
        user_agent: row.get("user_agent")?,
        accessed_at: row.get("accessed_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Document> {
        let document = document.clone();

        self.blocking(move |conn| {
            let created_at = now_millis();
            conn.execute(
                "INSERT INTO documents (title, page_count, wrapped_key, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    document.title,
                    document.page_count,
                    document.wrapped_key,
                    created_at
                ],
            )?;

            Ok(Document {
                id: DocumentId(conn.last_insert_rowid()),
                title: document.title,
                page_count: document.page_count,
                wrapped_key: document.wrapped_key,
                created_at,
            })
        })
        .await
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, title, page_count, wrapped_key, created_at
                 FROM documents WHERE id = ?1",
                params![id.0],
                row_to_document,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_document(&self, id: DocumentId) -> Result<bool> {
        self.blocking(move |conn| {
            let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", params![id.0])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn put_entitlement(&self, entitlement: &Entitlement) -> Result<()> {
        let entitlement = *entitlement;

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO entitlements (user_id, document_id, expires_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, document_id)
                 DO UPDATE SET expires_at = excluded.expires_at",
                params![
                    entitlement.user_id.0,
                    entitlement.document_id.0,
                    entitlement.expires_at
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<Option<Entitlement>> {
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT expires_at FROM entitlements WHERE user_id = ?1 AND document_id = ?2",
                params![user_id.0, document_id.0],
                |row| {
                    Ok(Entitlement {
                        user_id,
                        document_id,
                        expires_at: row.get(0)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn remove_entitlement(&self, user_id: UserId, document_id: DocumentId) -> Result<bool> {
        self.blocking(move |conn| {
            let removed = conn.execute(
                "DELETE FROM entitlements WHERE user_id = ?1 AND document_id = ?2",
                params![user_id.0, document_id.0],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<()> {
        let entry = entry.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO access_log (user_id, document_id, page, ip, user_agent, accessed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.user_id.0,
                    entry.document_id.0,
                    entry.page,
                    entry.ip,
                    entry.user_agent,
                    entry.accessed_at
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn access_log(&self, document_id: DocumentId) -> Result<Vec<AccessLogEntry>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, document_id, page, ip, user_agent, accessed_at
                 FROM access_log WHERE document_id = ?1
                 ORDER BY accessed_at, id",
            )?;

            let entries = stmt
                .query_map(params![document_id.0], row_to_access)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(entries)
        })
        .await
    }
}
