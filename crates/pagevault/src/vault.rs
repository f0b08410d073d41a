//! The Vault: one handle over storage, issuance, delivery and the pipeline.

use std::sync::Arc;

use pagevault_core::{
    now_millis, DocumentId, FixedWindowLimiter, MasterKey, RateLimiter, UserId,
};
use pagevault_license::{check_entitlement, LicenseSigner};
use pagevault_pipeline::EncryptionPipeline;
use pagevault_store::{FsPageStore, PageStore, SqliteStore, Store};

use crate::config::{RateLimitBackend, VaultConfig};
use crate::delivery::{PageDelivery, PageResponse};
use crate::error::{Result, VaultError};
use crate::issuance::{LicenseGrant, LicenseIssuer};
use crate::request::PageRequest;
use crate::viewer::{ViewerIdentity, ViewerManifest};

/// The main entry point.
///
/// Wires one configuration to:
/// - License issuance
/// - Page delivery
/// - The viewer manifest
/// - The encryption pipeline
pub struct Vault<S: Store, P: PageStore> {
    store: Arc<S>,
    pages: Arc<P>,
    master_key: Arc<MasterKey>,
    issuer: LicenseIssuer<S>,
    delivery: PageDelivery<S, P>,
}

impl Vault<SqliteStore, FsPageStore> {
    /// Open the SQLite database and page directory named in `config`.
    pub fn open(config: &VaultConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path)?;
        let limiter: Arc<dyn RateLimiter> = match config.rate_limit_backend {
            RateLimitBackend::Memory => Arc::new(FixedWindowLimiter::new(config.rate_limit)),
            RateLimitBackend::Sqlite => Arc::new(store.rate_limiter(config.rate_limit)),
        };
        let pages = FsPageStore::new(&config.pages_dir);

        tracing::info!(
            database = %config.database_path.display(),
            backend = ?config.rate_limit_backend,
            ttl = %config.license_ttl,
            "vault opened"
        );
        Ok(Self::with_backends(config, store, pages, limiter))
    }
}

impl<S: Store, P: PageStore> Vault<S, P> {
    /// Build a vault over the given backends.
    pub fn with_backends(
        config: &VaultConfig,
        store: S,
        pages: P,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let store = Arc::new(store);
        let pages = Arc::new(pages);
        let signer = LicenseSigner::new(config.signing_secret.clone());

        Self {
            issuer: LicenseIssuer::new(
                store.clone(),
                config.master_key.clone(),
                signer.clone(),
                config.license_ttl,
            ),
            delivery: PageDelivery::new(store.clone(), pages.clone(), signer, limiter),
            store,
            pages,
            master_key: config.master_key.clone(),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the page store reference.
    pub fn pages(&self) -> &P {
        &self.pages
    }

    pub fn issuer(&self) -> &LicenseIssuer<S> {
        &self.issuer
    }

    pub fn delivery(&self) -> &PageDelivery<S, P> {
        &self.delivery
    }

    /// An encryption pipeline writing into this vault's storage.
    pub fn pipeline(&self) -> EncryptionPipeline<S, P> {
        EncryptionPipeline::new(self.store.clone(), self.pages.clone(), self.master_key.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a license (see [`LicenseIssuer::issue`]).
    pub async fn issue_license(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<LicenseGrant> {
        self.issuer.issue(user_id, document_id).await
    }

    /// Serve a page (see [`PageDelivery::deliver`]).
    pub async fn deliver_page(&self, request: &PageRequest) -> Result<PageResponse> {
        self.delivery.deliver(request).await
    }

    /// Viewer manifest for an entitled user.
    pub async fn viewer_manifest(
        &self,
        viewer: &ViewerIdentity,
        document_id: DocumentId,
    ) -> Result<ViewerManifest> {
        self.viewer_manifest_at(viewer, document_id, now_millis()).await
    }

    /// Viewer manifest as of `now` (Unix ms).
    pub async fn viewer_manifest_at(
        &self,
        viewer: &ViewerIdentity,
        document_id: DocumentId,
        now: i64,
    ) -> Result<ViewerManifest> {
        let entitlement = self.store.get_entitlement(viewer.user_id, document_id).await?;
        check_entitlement(entitlement.as_ref(), now)?;

        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("document".into()))?;

        Ok(ViewerManifest {
            document_id,
            page_count: document.page_count,
            watermark: viewer.watermark(),
        })
    }
}
