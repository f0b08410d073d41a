//! The document encryption pipeline.
//!
//! One run turns a PDF or an image directory into a document record with a
//! wrapped content key plus one encrypted file per page.
//!
//! Pages are written strictly in order into the page store's staging area.
//! Only after the integrity self-check passes is the staged set promoted.
//! If anything fails after the document record exists, the staged pages and
//! the record are removed again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pagevault_core::{
    decrypt_page, encrypt_page, unwrap_content_key, wrap_content_key, ContentKey, DocumentId,
    MasterKey, NewDocument,
};
use pagevault_store::{PageStore, Store};

use crate::error::{PipelineError, Result};
use crate::rasterizer::{PopplerRasterizer, Rasterizer, DEFAULT_RESOLUTION};
use crate::source::{collect_images, PageSource, DEFAULT_IMAGE_EXT};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Document title.
    pub title: String,
    /// PDF file or image directory.
    pub input: PathBuf,
    /// Count pages and stop without writing anything.
    pub dry_run: bool,
    /// Extension of images in an input directory.
    pub image_ext: String,
    /// Rasterization resolution for PDFs (DPI).
    pub resolution: u32,
}

impl PipelineOptions {
    /// Options with default extension and resolution.
    pub fn new(title: impl Into<String>, input: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            input: input.into(),
            dry_run: false,
            image_ext: DEFAULT_IMAGE_EXT.to_string(),
            resolution: DEFAULT_RESOLUTION,
        }
    }

    /// Enable or disable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the image extension for directory inputs.
    pub fn image_ext(mut self, ext: impl Into<String>) -> Self {
        self.image_ext = ext.into();
        self
    }

    /// Set the rasterization resolution.
    pub fn resolution(mut self, dpi: u32) -> Self {
        self.resolution = dpi;
        self
    }
}

/// A successfully encrypted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDocument {
    pub document_id: DocumentId,
    pub title: String,
    pub page_count: u32,
}

/// What a pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Dry run: the page count, when it could be determined.
    DryRun { page_count: Option<u32> },
    /// The document was encrypted and published.
    Encrypted(EncryptedDocument),
}

/// Count the pages an input would produce, without writing anything.
///
/// Returns `None` for a PDF when the rasterizer cannot count pages.
pub async fn dry_run(options: &PipelineOptions, rasterizer: &dyn Rasterizer) -> Result<Option<u32>> {
    match PageSource::detect(&options.input)? {
        PageSource::Pdf(pdf) => rasterizer.page_count(&pdf).await,
        PageSource::ImageDir(dir) => {
            let images = collect_images(&dir, &options.image_ext).await?;
            Ok(Some(page_count_of(&images)?))
        }
    }
}

fn page_count_of(images: &[PathBuf]) -> Result<u32> {
    u32::try_from(images.len()).map_err(|_| PipelineError::TooManyPages(images.len()))
}

/// Encrypts documents into a [`Store`] and a [`PageStore`].
pub struct EncryptionPipeline<S: Store, P: PageStore> {
    store: Arc<S>,
    pages: Arc<P>,
    master_key: Arc<MasterKey>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl<S: Store, P: PageStore> EncryptionPipeline<S, P> {
    /// Create a pipeline using Poppler for PDFs.
    pub fn new(store: Arc<S>, pages: Arc<P>, master_key: Arc<MasterKey>) -> Self {
        Self {
            store,
            pages,
            master_key,
            rasterizer: Arc::new(PopplerRasterizer::default()),
        }
    }

    /// Replace the PDF rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Run the pipeline.
    pub async fn run(&self, options: &PipelineOptions) -> Result<PipelineOutcome> {
        if options.dry_run {
            let page_count = dry_run(options, self.rasterizer.as_ref()).await?;
            return Ok(PipelineOutcome::DryRun { page_count });
        }

        // Keeps rasterizer output alive until the pages are encrypted.
        let mut work_dir = None;
        let images = match PageSource::detect(&options.input)? {
            PageSource::Pdf(pdf) => {
                tracing::info!("converting PDF to page images");
                let dir = tempfile::tempdir()?;
                let images = self
                    .rasterizer
                    .rasterize(&pdf, dir.path(), options.resolution)
                    .await?;
                work_dir = Some(dir);
                images
            }
            PageSource::ImageDir(dir) => {
                tracing::info!("using pre-split page images");
                collect_images(&dir, &options.image_ext).await?
            }
        };

        let encrypted = self.encrypt(&options.title, &images).await;
        drop(work_dir);
        encrypted.map(PipelineOutcome::Encrypted)
    }

    /// Encrypt an ordered list of page images as a new document.
    pub async fn encrypt(&self, title: &str, images: &[PathBuf]) -> Result<EncryptedDocument> {
        if images.is_empty() {
            return Err(PipelineError::NoPages("empty page list".into()));
        }
        let page_count = page_count_of(images)?;

        let content_key = ContentKey::generate();
        let wrapped_key = wrap_content_key(&self.master_key, &content_key)?;

        let document = self
            .store
            .insert_document(&NewDocument {
                title: title.to_string(),
                page_count,
                wrapped_key,
            })
            .await?;
        let document_id = document.id;
        tracing::info!(document_id = %document_id, page_count, "encrypting pages");

        let mut promoted = false;
        let result = self
            .write_pages(document_id, page_count, &content_key, images, &mut promoted)
            .await;

        if let Err(e) = result {
            tracing::error!(document_id = %document_id, error = %e, "encryption failed, cleaning up");
            self.cleanup(document_id, promoted).await;
            return Err(e);
        }

        tracing::info!(document_id = %document_id, "document encrypted");
        Ok(EncryptedDocument {
            document_id,
            title: document.title,
            page_count,
        })
    }

    async fn write_pages(
        &self,
        document_id: DocumentId,
        page_count: u32,
        content_key: &ContentKey,
        images: &[PathBuf],
        promoted: &mut bool,
    ) -> Result<()> {
        for (page, path) in (1..=page_count).zip(images) {
            let sealed = encrypt_page(content_key, &read_page(path, page).await?)?;
            self.pages.put_staged(document_id, page, &sealed).await?;
            tracing::debug!(page, total = page_count, "page encrypted");
        }

        self.self_check(document_id, content_key).await?;

        self.pages.promote(document_id).await?;
        *promoted = true;

        let found = self.pages.page_count(document_id).await?;
        if found != page_count {
            return Err(PipelineError::PageCountMismatch {
                expected: page_count,
                found,
            });
        }
        Ok(())
    }

    /// Unwrap the persisted key and compare it with the one in memory, then
    /// decrypt the first staged page with it.
    async fn self_check(&self, document_id: DocumentId, content_key: &ContentKey) -> Result<()> {
        let stored = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::SelfCheck("document record missing".into()))?;

        let unwrapped = unwrap_content_key(&self.master_key, &stored.wrapped_key)
            .map_err(|e| PipelineError::SelfCheck(format!("wrapped key: {e}")))?;
        if &unwrapped != content_key {
            return Err(PipelineError::SelfCheck("wrapped key mismatch".into()));
        }

        let first = self
            .pages
            .get_staged(document_id, 1)
            .await?
            .ok_or_else(|| PipelineError::SelfCheck("first page missing".into()))?;
        decrypt_page(&unwrapped, &first)
            .map_err(|e| PipelineError::SelfCheck(format!("first page: {e}")))?;

        tracing::debug!(document_id = %document_id, "wrapped key integrity verified");
        Ok(())
    }

    async fn cleanup(&self, document_id: DocumentId, promoted: bool) {
        if let Err(e) = self.pages.discard_staged(document_id).await {
            tracing::warn!(document_id = %document_id, error = %e, "failed to discard staged pages");
        }
        if promoted {
            if let Err(e) = self.pages.delete_pages(document_id).await {
                tracing::warn!(document_id = %document_id, error = %e, "failed to delete pages");
            }
        }
        if let Err(e) = self.store.delete_document(document_id).await {
            tracing::warn!(document_id = %document_id, error = %e, "failed to delete document record");
        }
    }
}

async fn read_page(path: &Path, page: u32) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| PipelineError::ReadPage { page, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pagevault_core::{AccessLogEntry, Document, Entitlement, UserId};
    use pagevault_store::{MemoryPageStore, MemoryStore, StoreError};

    fn master() -> Arc<MasterKey> {
        Arc::new(MasterKey::from_bytes([0x11; 32]))
    }

    fn write_images(dir: &Path, count: usize) -> Vec<Vec<u8>> {
        (1..=count)
            .map(|i| {
                let bytes = format!("page image {i}").into_bytes();
                std::fs::write(dir.join(format!("{i:03}.png")), &bytes).unwrap();
                bytes
            })
            .collect()
    }

    fn pipeline() -> (
        Arc<MemoryStore>,
        Arc<MemoryPageStore>,
        EncryptionPipeline<MemoryStore, MemoryPageStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let pages = Arc::new(MemoryPageStore::new());
        let pipeline = EncryptionPipeline::new(store.clone(), pages.clone(), master());
        (store, pages, pipeline)
    }

    #[tokio::test]
    async fn test_encrypt_image_directory() {
        let dir = tempfile::tempdir().unwrap();
        let originals = write_images(dir.path(), 3);
        let (store, pages, pipeline) = pipeline();

        let outcome = pipeline
            .run(&PipelineOptions::new("Field Guide", dir.path()))
            .await
            .unwrap();
        let PipelineOutcome::Encrypted(doc) = outcome else {
            panic!("expected encrypted outcome");
        };
        assert_eq!(doc.page_count, 3);

        let record = store.get_document(doc.document_id).await.unwrap().unwrap();
        assert_eq!(record.title, "Field Guide");
        assert_eq!(record.page_count, 3);
        assert_eq!(pages.page_count(doc.document_id).await.unwrap(), 3);

        let key = unwrap_content_key(&master(), &record.wrapped_key).unwrap();
        for (i, original) in originals.iter().enumerate() {
            let sealed = pages
                .get_page(doc.document_id, i as u32 + 1)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&decrypt_page(&key, &sealed).unwrap(), original);
        }
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 4);
        let (store, pages, pipeline) = pipeline();

        let outcome = pipeline
            .run(&PipelineOptions::new("t", dir.path()).dry_run(true))
            .await
            .unwrap();
        assert_eq!(outcome, PipelineOutcome::DryRun { page_count: Some(4) });
        assert!(store.get_document(DocumentId(1)).await.unwrap().is_none());
        assert!(!pages.has_staged(DocumentId(1)).unwrap());
    }

    #[tokio::test]
    async fn test_empty_directory_fails_before_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _pages, pipeline) = pipeline();

        let err = pipeline
            .run(&PipelineOptions::new("t", dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoPages(_)));
        assert!(store.get_document(DocumentId(1)).await.unwrap().is_none());
    }

    /// Fails promotion so the cleanup path runs.
    struct RefusingPages(MemoryPageStore);

    #[async_trait]
    impl PageStore for RefusingPages {
        async fn put_staged(&self, d: DocumentId, p: u32, b: &[u8]) -> pagevault_store::Result<()> {
            self.0.put_staged(d, p, b).await
        }
        async fn get_staged(&self, d: DocumentId, p: u32) -> pagevault_store::Result<Option<bytes::Bytes>> {
            self.0.get_staged(d, p).await
        }
        async fn promote(&self, _d: DocumentId) -> pagevault_store::Result<()> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        async fn discard_staged(&self, d: DocumentId) -> pagevault_store::Result<()> {
            self.0.discard_staged(d).await
        }
        async fn delete_pages(&self, d: DocumentId) -> pagevault_store::Result<()> {
            self.0.delete_pages(d).await
        }
        async fn get_page(&self, d: DocumentId, p: u32) -> pagevault_store::Result<Option<bytes::Bytes>> {
            self.0.get_page(d, p).await
        }
        async fn page_count(&self, d: DocumentId) -> pagevault_store::Result<u32> {
            self.0.page_count(d).await
        }
    }

    #[tokio::test]
    async fn test_failure_rolls_back_record_and_staging() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 2);
        let store = Arc::new(MemoryStore::new());
        let pages = Arc::new(RefusingPages(MemoryPageStore::new()));
        let pipeline = EncryptionPipeline::new(store.clone(), pages.clone(), master());

        let err = pipeline
            .run(&PipelineOptions::new("t", dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
        assert!(store.get_document(DocumentId(1)).await.unwrap().is_none());
        assert!(!pages.0.has_staged(DocumentId(1)).unwrap());
    }

    /// Hands back a different wrapped key than the one persisted.
    struct CorruptingStore {
        inner: MemoryStore,
        wrapped_key: String,
    }

    #[async_trait]
    impl Store for CorruptingStore {
        async fn insert_document(&self, d: &NewDocument) -> pagevault_store::Result<Document> {
            self.inner.insert_document(d).await
        }
        async fn get_document(&self, id: DocumentId) -> pagevault_store::Result<Option<Document>> {
            Ok(self.inner.get_document(id).await?.map(|doc| Document {
                wrapped_key: self.wrapped_key.clone(),
                ..doc
            }))
        }
        async fn delete_document(&self, id: DocumentId) -> pagevault_store::Result<bool> {
            self.inner.delete_document(id).await
        }
        async fn put_entitlement(&self, e: &Entitlement) -> pagevault_store::Result<()> {
            self.inner.put_entitlement(e).await
        }
        async fn get_entitlement(
            &self,
            u: UserId,
            d: DocumentId,
        ) -> pagevault_store::Result<Option<Entitlement>> {
            self.inner.get_entitlement(u, d).await
        }
        async fn remove_entitlement(&self, u: UserId, d: DocumentId) -> pagevault_store::Result<bool> {
            self.inner.remove_entitlement(u, d).await
        }
        async fn append_access_log(&self, e: &AccessLogEntry) -> pagevault_store::Result<()> {
            self.inner.append_access_log(e).await
        }
        async fn access_log(&self, d: DocumentId) -> pagevault_store::Result<Vec<AccessLogEntry>> {
            self.inner.access_log(d).await
        }
    }

    #[tokio::test]
    async fn test_wrapped_key_self_check_failure_rolls_back() {
        let other_key = wrap_content_key(&master(), &ContentKey::generate()).unwrap();
        let mut garbled = wrap_content_key(&master(), &ContentKey::generate()).unwrap();
        garbled.replace_range(0..4, "AAAA");

        for wrapped_key in [other_key, garbled, "not base64!".to_string()] {
            let dir = tempfile::tempdir().unwrap();
            write_images(dir.path(), 3);
            let store = Arc::new(CorruptingStore {
                inner: MemoryStore::new(),
                wrapped_key: wrapped_key.clone(),
            });
            let pages = Arc::new(MemoryPageStore::new());
            let pipeline = EncryptionPipeline::new(store.clone(), pages.clone(), master());

            let err = pipeline
                .run(&PipelineOptions::new("t", dir.path()))
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::SelfCheck(_)), "{wrapped_key}: {err}");

            assert!(store.inner.get_document(DocumentId(1)).await.unwrap().is_none());
            assert!(!pages.has_staged(DocumentId(1)).unwrap());
            assert_eq!(pages.page_count(DocumentId(1)).await.unwrap(), 0);
            assert!(pages.get_page(DocumentId(1), 1).await.unwrap().is_none());
        }
    }

    /// Reports one page fewer than was published.
    struct UnderCountingPages(MemoryPageStore);

    #[async_trait]
    impl PageStore for UnderCountingPages {
        async fn put_staged(&self, d: DocumentId, p: u32, b: &[u8]) -> pagevault_store::Result<()> {
            self.0.put_staged(d, p, b).await
        }
        async fn get_staged(&self, d: DocumentId, p: u32) -> pagevault_store::Result<Option<bytes::Bytes>> {
            self.0.get_staged(d, p).await
        }
        async fn promote(&self, d: DocumentId) -> pagevault_store::Result<()> {
            self.0.promote(d).await
        }
        async fn discard_staged(&self, d: DocumentId) -> pagevault_store::Result<()> {
            self.0.discard_staged(d).await
        }
        async fn delete_pages(&self, d: DocumentId) -> pagevault_store::Result<()> {
            self.0.delete_pages(d).await
        }
        async fn get_page(&self, d: DocumentId, p: u32) -> pagevault_store::Result<Option<bytes::Bytes>> {
            self.0.get_page(d, p).await
        }
        async fn page_count(&self, d: DocumentId) -> pagevault_store::Result<u32> {
            Ok(self.0.page_count(d).await?.saturating_sub(1))
        }
    }

    #[tokio::test]
    async fn test_page_count_mismatch_deletes_published_pages() {
        let dir = tempfile::tempdir().unwrap();
        write_images(dir.path(), 3);
        let store = Arc::new(MemoryStore::new());
        let pages = Arc::new(UnderCountingPages(MemoryPageStore::new()));
        let pipeline = EncryptionPipeline::new(store.clone(), pages.clone(), master());

        let err = pipeline
            .run(&PipelineOptions::new("t", dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PageCountMismatch {
                expected: 3,
                found: 2
            }
        ));

        assert!(store.get_document(DocumentId(1)).await.unwrap().is_none());
        assert_eq!(pages.0.page_count(DocumentId(1)).await.unwrap(), 0);
        for page in 1..=3 {
            assert!(pages.0.get_page(DocumentId(1), page).await.unwrap().is_none());
        }
    }

    /// Writes fixed images instead of calling an external tool.
    struct FakeRasterizer {
        pages: usize,
    }

    #[async_trait]
    impl Rasterizer for FakeRasterizer {
        async fn page_count(&self, _pdf: &Path) -> Result<Option<u32>> {
            Ok(Some(self.pages as u32))
        }

        async fn rasterize(&self, _pdf: &Path, out_dir: &Path, _resolution: u32) -> Result<Vec<PathBuf>> {
            write_images(out_dir, self.pages);
            Ok((1..=self.pages)
                .map(|i| out_dir.join(format!("{i:03}.png")))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_pdf_input_uses_rasterizer() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("book.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let (_store, pages, pipeline) = pipeline();
        let pipeline = pipeline.with_rasterizer(Arc::new(FakeRasterizer { pages: 5 }));

        let dry = pipeline
            .run(&PipelineOptions::new("t", &pdf).dry_run(true))
            .await
            .unwrap();
        assert_eq!(dry, PipelineOutcome::DryRun { page_count: Some(5) });

        let PipelineOutcome::Encrypted(doc) = pipeline
            .run(&PipelineOptions::new("t", &pdf))
            .await
            .unwrap()
        else {
            panic!("expected encrypted outcome");
        };
        assert_eq!(pages.page_count(doc.document_id).await.unwrap(), 5);
    }
}
