//! In-memory implementations of [`Store`] and [`PageStore`].
//!
//! These are primarily for testing. They have the same semantics as the
//! SQLite and filesystem backends but keep everything in memory.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use pagevault_core::{
    now_millis, AccessLogEntry, Document, DocumentId, Entitlement, NewDocument, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{PageStore, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Documents indexed by id.
    documents: BTreeMap<DocumentId, Document>,

    /// Next id to assign.
    next_id: i64,

    /// Entitlements indexed by (user, document).
    entitlements: HashMap<(UserId, DocumentId), Entitlement>,

    /// Append-only access log.
    access_log: Vec<AccessLogEntry>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                documents: BTreeMap::new(),
                next_id: 1,
                entitlements: HashMap::new(),
                access_log: Vec::new(),
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_document(&self, document: &NewDocument) -> Result<Document> {
        let mut inner = self.write()?;
        let id = DocumentId(inner.next_id);
        inner.next_id += 1;

        let stored = Document {
            id,
            title: document.title.clone(),
            page_count: document.page_count,
            wrapped_key: document.wrapped_key.clone(),
            created_at: now_millis(),
        };
        inner.documents.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    async fn delete_document(&self, id: DocumentId) -> Result<bool> {
        Ok(self.write()?.documents.remove(&id).is_some())
    }

    async fn put_entitlement(&self, entitlement: &Entitlement) -> Result<()> {
        self.write()?.entitlements.insert(
            (entitlement.user_id, entitlement.document_id),
            *entitlement,
        );
        Ok(())
    }

    async fn get_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<Option<Entitlement>> {
        Ok(self
            .read()?
            .entitlements
            .get(&(user_id, document_id))
            .copied())
    }

    async fn remove_entitlement(&self, user_id: UserId, document_id: DocumentId) -> Result<bool> {
        Ok(self
            .write()?
            .entitlements
            .remove(&(user_id, document_id))
            .is_some())
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<()> {
        self.write()?.access_log.push(entry.clone());
        Ok(())
    }

    async fn access_log(&self, document_id: DocumentId) -> Result<Vec<AccessLogEntry>> {
        Ok(self
            .read()?
            .access_log
            .iter()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect())
    }
}

/// In-memory page store.
pub struct MemoryPageStore {
    inner: RwLock<MemoryPageStoreInner>,
}

#[derive(Default)]
struct MemoryPageStoreInner {
    staged: HashMap<DocumentId, BTreeMap<u32, Bytes>>,
    published: HashMap<DocumentId, BTreeMap<u32, Bytes>>,
}

impl MemoryPageStore {
    /// Create a new empty page store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryPageStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryPageStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryPageStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Overwrite a published page in place, bypassing staging.
    pub fn replace_page(&self, document_id: DocumentId, page: u32, sealed: Vec<u8>) -> Result<()> {
        self.write()?
            .published
            .entry(document_id)
            .or_default()
            .insert(page, Bytes::from(sealed));
        Ok(())
    }

    /// Whether a staging area exists for a document.
    pub fn has_staged(&self, document_id: DocumentId) -> Result<bool> {
        Ok(self.read()?.staged.contains_key(&document_id))
    }
}

impl Default for MemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn put_staged(&self, document_id: DocumentId, page: u32, sealed: &[u8]) -> Result<()> {
        self.write()?
            .staged
            .entry(document_id)
            .or_default()
            .insert(page, Bytes::copy_from_slice(sealed));
        Ok(())
    }

    async fn get_staged(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>> {
        Ok(self
            .read()?
            .staged
            .get(&document_id)
            .and_then(|pages| pages.get(&page))
            .cloned())
    }

    async fn promote(&self, document_id: DocumentId) -> Result<()> {
        let mut inner = self.write()?;
        if inner.published.contains_key(&document_id) {
            return Err(StoreError::AlreadyExists(format!(
                "pages for document {document_id}"
            )));
        }
        let staged = inner
            .staged
            .remove(&document_id)
            .ok_or_else(|| StoreError::NotFound(format!("staged pages for document {document_id}")))?;
        inner.published.insert(document_id, staged);
        Ok(())
    }

    async fn discard_staged(&self, document_id: DocumentId) -> Result<()> {
        self.write()?.staged.remove(&document_id);
        Ok(())
    }

    async fn delete_pages(&self, document_id: DocumentId) -> Result<()> {
        self.write()?.published.remove(&document_id);
        Ok(())
    }

    async fn get_page(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>> {
        Ok(self
            .read()?
            .published
            .get(&document_id)
            .and_then(|pages| pages.get(&page))
            .cloned())
    }

    async fn page_count(&self, document_id: DocumentId) -> Result<u32> {
        let inner = self.read()?;
        let Some(pages) = inner.published.get(&document_id) else {
            return Ok(0);
        };
        let mut count = 0u32;
        while pages.contains_key(&(count + 1)) {
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;

    fn new_doc(title: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            page_count: 3,
            wrapped_key: "d3JhcHBlZA==".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_documents() {
        let store = MemoryStore::new();
        let a = store.insert_document(&new_doc("a")).await.unwrap();
        let b = store.insert_document(&new_doc("b")).await.unwrap();
        assert_ne!(a.id, b.id);

        let fetched = store.get_document(a.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "a");
        assert_eq!(fetched.page_count, 3);

        assert!(store.delete_document(a.id).await.unwrap());
        assert!(!store.delete_document(a.id).await.unwrap());
        assert!(store.get_document(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_entitlements() {
        let store = MemoryStore::new();
        let user = UserId(1);
        let doc = DocumentId(9);
        assert!(store.get_entitlement(user, doc).await.unwrap().is_none());

        store
            .put_entitlement(&Entitlement::permanent(user, doc))
            .await
            .unwrap();
        assert_eq!(
            store.get_entitlement(user, doc).await.unwrap(),
            Some(Entitlement::permanent(user, doc))
        );

        assert!(store.expire_entitlement(user, doc, 500).await.unwrap());
        let ent = store.get_entitlement(user, doc).await.unwrap().unwrap();
        assert_eq!(ent.expires_at, Some(500));

        assert!(store.remove_entitlement(user, doc).await.unwrap());
        assert!(!store.expire_entitlement(user, doc, 500).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_access_log() {
        let store = MemoryStore::new();
        let entry = AccessLogEntry::new(UserId(1), DocumentId(2), 1, "10.0.0.1", "ua", 5);
        store.append_access_log(&entry).await.unwrap();
        store
            .append_access_log(&AccessLogEntry::new(UserId(1), DocumentId(3), 1, "", "", 6))
            .await
            .unwrap();

        let log = store.access_log(DocumentId(2)).await.unwrap();
        assert_eq!(log, vec![entry]);
    }

    #[tokio::test]
    async fn test_memory_pages_staging() {
        let pages = MemoryPageStore::new();
        let doc = DocumentId(1);
        pages.put_staged(doc, 1, b"one").await.unwrap();
        pages.put_staged(doc, 2, b"two").await.unwrap();

        // Not visible until promoted.
        assert!(pages.get_page(doc, 1).await.unwrap().is_none());
        assert_eq!(pages.page_count(doc).await.unwrap(), 0);
        assert_eq!(
            pages.get_staged(doc, 2).await.unwrap().unwrap().as_ref(),
            b"two"
        );

        pages.promote(doc).await.unwrap();
        assert_eq!(pages.get_page(doc, 2).await.unwrap().unwrap().as_ref(), b"two");
        assert_eq!(pages.page_count(doc).await.unwrap(), 2);
        assert!(!pages.has_staged(doc).unwrap());
    }

    #[tokio::test]
    async fn test_memory_pages_promote_refuses_overwrite() {
        let pages = MemoryPageStore::new();
        let doc = DocumentId(1);
        pages.put_staged(doc, 1, b"one").await.unwrap();
        pages.promote(doc).await.unwrap();

        pages.put_staged(doc, 1, b"other").await.unwrap();
        let err = pages.promote(doc).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(pages.get_page(doc, 1).await.unwrap().unwrap().as_ref(), b"one");
    }

    #[tokio::test]
    async fn test_memory_pages_discard_and_gaps() {
        let pages = MemoryPageStore::new();
        let doc = DocumentId(1);
        pages.put_staged(doc, 1, b"one").await.unwrap();
        pages.discard_staged(doc).await.unwrap();
        pages.discard_staged(doc).await.unwrap();
        assert!(matches!(
            pages.promote(doc).await.unwrap_err(),
            StoreError::NotFound(_)
        ));

        pages.put_staged(doc, 1, b"one").await.unwrap();
        pages.put_staged(doc, 3, b"three").await.unwrap();
        pages.promote(doc).await.unwrap();
        assert_eq!(pages.page_count(doc).await.unwrap(), 1);

        pages.delete_pages(doc).await.unwrap();
        assert!(pages.get_page(doc, 1).await.unwrap().is_none());
    }

    proptest::proptest! {
        #[test]
        fn test_page_count_is_contiguous_prefix(pages in proptest::collection::btree_set(1u32..40, 0..20)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryPageStore::new();
                let doc = DocumentId(1);
                for &page in &pages {
                    store.put_staged(doc, page, b"x").await.unwrap();
                }
                if !pages.is_empty() {
                    store.promote(doc).await.unwrap();
                }

                let expected = (1..).take_while(|p| pages.contains(p)).count() as u32;
                assert_eq!(store.page_count(doc).await.unwrap(), expected);
            });
        }
    }
}
