//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use pagevault::{ClientInfo, PageRequest, Vault, VaultConfig};
use pagevault_core::{
    AccessLogEntry, Document, DocumentId, Entitlement, FixedWindowLimiter, MasterKey,
    NewDocument, RateLimitPolicy, UserId,
};
use pagevault_license::{LicenseSigner, SigningSecret};
use pagevault_pipeline::{PipelineOptions, PipelineOutcome};
use pagevault_store::{MemoryPageStore, MemoryStore, Store, StoreError};

/// Fixed reference time, Unix ms.
pub const T0: i64 = 1_700_000_000_000;

/// Signing secret used by [`test_config`].
pub const TEST_SIGNING_SECRET: &str = "testkit-signing-secret";

/// Client address used by [`TestVault::request`].
pub const TEST_CLIENT_IP: &str = "203.0.113.10";

/// A configuration with a fixed master key and signing secret.
pub fn test_config() -> VaultConfig {
    VaultConfig::new(
        MasterKey::from_bytes([0x42; 32]),
        SigningSecret::new(TEST_SIGNING_SECRET).unwrap(),
    )
}

/// Signer matching [`test_config`].
pub fn test_signer() -> LicenseSigner {
    LicenseSigner::new(SigningSecret::new(TEST_SIGNING_SECRET).unwrap())
}

/// Distinct, recognisable page images.
pub fn sample_pages(count: usize) -> Vec<Vec<u8>> {
    (1..=count)
        .map(|i| {
            let mut page = format!("\u{89}PNG fixture page {i}\n").into_bytes();
            page.extend((0..64).map(|b| (b * i) as u8));
            page
        })
        .collect()
}

/// A vault over in-memory page storage.
pub struct TestVault<S: Store = MemoryStore> {
    pub vault: Vault<S, MemoryPageStore>,
    pub config: VaultConfig,
}

impl TestVault<MemoryStore> {
    /// A vault with an in-memory store and the default rate limit.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), RateLimitPolicy::default())
    }

    /// A vault with an in-memory store and a custom rate limit.
    pub fn with_policy(policy: RateLimitPolicy) -> Self {
        Self::with_store(MemoryStore::new(), policy)
    }
}

impl Default for TestVault<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestVault<S> {
    /// A vault over `store`.
    pub fn with_store(store: S, policy: RateLimitPolicy) -> Self {
        let mut config = test_config();
        config.rate_limit = policy;
        let limiter = Arc::new(FixedWindowLimiter::new(policy));
        let vault = Vault::with_backends(&config, store, MemoryPageStore::new(), limiter);
        Self { vault, config }
    }

    /// Run the pipeline over `pages` written as an image directory.
    pub async fn encrypt_pages(&self, title: &str, pages: &[Vec<u8>]) -> DocumentId {
        let dir = tempfile::tempdir().unwrap();
        for (i, page) in pages.iter().enumerate() {
            std::fs::write(dir.path().join(format!("page-{:04}.png", i + 1)), page).unwrap();
        }

        let outcome = self
            .vault
            .pipeline()
            .run(&PipelineOptions::new(title, dir.path()))
            .await
            .unwrap();
        match outcome {
            PipelineOutcome::Encrypted(doc) => doc.document_id,
            other => panic!("unexpected pipeline outcome: {other:?}"),
        }
    }

    /// Grant `user_id` access to `document_id`, optionally until `expires_at`.
    pub async fn entitle(&self, user_id: UserId, document_id: DocumentId, expires_at: Option<i64>) {
        let entitlement = match expires_at {
            Some(at) => Entitlement::until(user_id, document_id, at),
            None => Entitlement::permanent(user_id, document_id),
        };
        self.vault.store().put_entitlement(&entitlement).await.unwrap();
    }

    /// A page request from [`TestVault::request`]'s fixed client carrying
    /// `token`.
    pub fn request(&self, user_id: UserId, document_id: DocumentId, page: u32, token: &str) -> PageRequest {
        PageRequest::new(
            user_id,
            document_id,
            page,
            ClientInfo::new(TEST_CLIENT_IP, "testkit/1.0"),
        )
        .bearer(token)
    }
}

/// A [`MemoryStore`] whose access-log writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_access_log: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent access-log write fail (or succeed again).
    pub fn fail_access_log(&self, fail: bool) {
        self.fail_access_log.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn insert_document(&self, document: &NewDocument) -> pagevault_store::Result<Document> {
        self.inner.insert_document(document).await
    }

    async fn get_document(&self, id: DocumentId) -> pagevault_store::Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn delete_document(&self, id: DocumentId) -> pagevault_store::Result<bool> {
        self.inner.delete_document(id).await
    }

    async fn put_entitlement(&self, entitlement: &Entitlement) -> pagevault_store::Result<()> {
        self.inner.put_entitlement(entitlement).await
    }

    async fn get_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> pagevault_store::Result<Option<Entitlement>> {
        self.inner.get_entitlement(user_id, document_id).await
    }

    async fn remove_entitlement(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> pagevault_store::Result<bool> {
        self.inner.remove_entitlement(user_id, document_id).await
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> pagevault_store::Result<()> {
        if self.fail_access_log.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("access log unavailable")));
        }
        self.inner.append_access_log(entry).await
    }

    async fn access_log(&self, document_id: DocumentId) -> pagevault_store::Result<Vec<AccessLogEntry>> {
        self.inner.access_log(document_id).await
    }
}
