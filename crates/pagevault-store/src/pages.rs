//! Filesystem implementation of the PageStore trait.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<documentId>/<page>.enc            published pages
//! <root>/.staging/<documentId>/<page>.enc   pages being written
//! ```
//!
//! Promotion renames the staging directory into place, which is atomic when
//! both live on the same filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use pagevault_core::DocumentId;

use crate::error::{Result, StoreError};
use crate::traits::PageStore;

/// Extension of encrypted page files.
pub const PAGE_FILE_EXT: &str = "enc";

const STAGING_DIR: &str = ".staging";

/// Encrypted pages stored as one file per page.
#[derive(Debug, Clone)]
pub struct FsPageStore {
    root: PathBuf,
}

impl FsPageStore {
    /// Use `root` as the page directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a document's published pages.
    pub fn document_dir(&self, document_id: DocumentId) -> PathBuf {
        self.root.join(document_id.to_string())
    }

    /// Path of a published page file.
    pub fn page_path(&self, document_id: DocumentId, page: u32) -> PathBuf {
        self.document_dir(document_id).join(page_file_name(page))
    }

    fn staging_dir(&self, document_id: DocumentId) -> PathBuf {
        self.root.join(STAGING_DIR).join(document_id.to_string())
    }
}

fn page_file_name(page: u32) -> String {
    format!("{page}.{PAGE_FILE_EXT}")
}

async fn read_optional(path: &Path) -> Result<Option<Bytes>> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn exists(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PageStore for FsPageStore {
    async fn put_staged(&self, document_id: DocumentId, page: u32, sealed: &[u8]) -> Result<()> {
        let dir = self.staging_dir(document_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(page_file_name(page)), sealed).await?;
        Ok(())
    }

    async fn get_staged(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>> {
        read_optional(&self.staging_dir(document_id).join(page_file_name(page))).await
    }

    async fn promote(&self, document_id: DocumentId) -> Result<()> {
        let staged = self.staging_dir(document_id);
        let target = self.document_dir(document_id);

        if exists(&target).await? {
            return Err(StoreError::AlreadyExists(format!(
                "pages for document {document_id}"
            )));
        }
        if !exists(&staged).await? {
            return Err(StoreError::NotFound(format!(
                "staged pages for document {document_id}"
            )));
        }

        tokio::fs::rename(&staged, &target).await?;
        tracing::debug!(document_id = %document_id, "promoted staged pages");
        Ok(())
    }

    async fn discard_staged(&self, document_id: DocumentId) -> Result<()> {
        match tokio::fs::remove_dir_all(self.staging_dir(document_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_pages(&self, document_id: DocumentId) -> Result<()> {
        match tokio::fs::remove_dir_all(self.document_dir(document_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_page(&self, document_id: DocumentId, page: u32) -> Result<Option<Bytes>> {
        read_optional(&self.page_path(document_id, page)).await
    }

    async fn page_count(&self, document_id: DocumentId) -> Result<u32> {
        let mut count = 0u32;
        while exists(&self.page_path(document_id, count + 1)).await? {
            count += 1;
        }
        Ok(count)
    }
}
