//! Storage traits: the abstract interface for records and encrypted pages.
//!
//! The services are generic over these traits. Implementations include
//! SQLite and the filesystem (primary) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use pagevault_core::{AccessLogEntry, Document, DocumentId, Entitlement, NewDocument, UserId};

use crate::error::Result;

/// The Store trait: async interface for document metadata, entitlements,
/// and the access log.
///
/// For SQLite, operations run on the blocking thread pool via
/// `spawn_blocking` so they never stall the runtime.
///
/// # Design Notes
///
/// - **Documents are immutable**: once inserted, only deletion is supported,
///   and only the pipeline's failure cleanup uses it.
/// - **Entitlements are upserted**: the storefront owns them; this core only
///   reads them, but tests and tooling need to write them.
/// - **Access log is append-only**.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a new document and return it with its assigned id.
    async fn insert_document(&self, document: &NewDocument) -> Result<Document>;

    /// Look up a document by id.
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Delete a document. Returns `false` if it did not exist.
    async fn delete_document(&self, id: DocumentId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Entitlements
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the entitlement for `(user_id, document_id)`.
    async fn put_entitlement(&self, entitlement: &Entitlement) -> Result<()>;

    /// Look up the entitlement for a user and document.
    async fn get_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<Option<Entitlement>>;

    /// Remove an entitlement. Returns `false` if it did not exist.
    async fn remove_entitlement(&self, user_id: UserId, document_id: DocumentId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Access Log
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an access-log entry.
    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<()>;

    /// All access-log entries for a document, oldest first.
    async fn access_log(&self, document_id: DocumentId) -> Result<Vec<AccessLogEntry>>;
}

/// Extension methods built on [`Store`].
pub trait StoreExt: Store {
    /// Expire an existing entitlement at `at` (Unix ms).
    ///
    /// Returns `false` if there was no entitlement to expire.
    fn expire_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        at: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn expire_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        at: i64,
    ) -> Result<bool> {
        match self.get_entitlement(user_id, document_id).await? {
            Some(mut entitlement) => {
                entitlement.expires_at = Some(at);
                self.put_entitlement(&entitlement).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Durable storage for encrypted page files.
///
/// Pages are written to a per-document staging area first and become
/// visible only when [`PageStore::promote`] moves the complete set into
/// place. Readers never observe a partially written document.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Write one staged page (1-based).
    async fn put_staged(&self, document_id: DocumentId, page: u32, sealed: &[u8]) -> Result<()>;

    /// Read back a staged page, if present.
    async fn get_staged(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>>;

    /// Atomically publish all staged pages for a document.
    ///
    /// Fails with [`crate::StoreError::AlreadyExists`] if the document already
    /// has published pages.
    async fn promote(&self, document_id: DocumentId) -> Result<()>;

    /// Drop any staged pages for a document. Missing staging is not an error.
    async fn discard_staged(&self, document_id: DocumentId) -> Result<()>;

    /// Remove all published pages for a document. Missing pages are not an
    /// error.
    async fn delete_pages(&self, document_id: DocumentId) -> Result<()>;

    /// Read a published page.
    async fn get_page(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>>;

    /// Number of contiguously numbered published pages, counting from 1.
    async fn page_count(&self, document_id: DocumentId) -> Result<u32>;
}
