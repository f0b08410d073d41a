//! Page delivery.
//!
//! Checks run cheapest first: rate limit, license signature and expiry,
//! license scope, a fresh entitlement lookup, then the page fetch. The
//! service only ever returns ciphertext.

use std::sync::Arc;

use bytes::Bytes;

use pagevault_core::{now_millis, AccessLogEntry, RateLimiter};
use pagevault_license::{check_entitlement, LicenseError, LicenseSigner};
use pagevault_store::{PageStore, Store};

use crate::error::{Result, VaultError};
use crate::request::PageRequest;

pub const PAGE_CONTENT_TYPE: &str = "application/octet-stream";
pub const PAGE_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// An encrypted page ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    /// `nonce(16) || tag(16) || ciphertext`.
    pub body: Bytes,
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

impl PageResponse {
    fn new(body: Bytes) -> Self {
        Self {
            body,
            content_type: PAGE_CONTENT_TYPE,
            cache_control: PAGE_CACHE_CONTROL,
        }
    }
}

/// Serves encrypted pages to license holders.
pub struct PageDelivery<S: Store, P: PageStore> {
    store: Arc<S>,
    pages: Arc<P>,
    signer: LicenseSigner,
    limiter: Arc<dyn RateLimiter>,
}

impl<S: Store, P: PageStore> PageDelivery<S, P> {
    pub fn new(
        store: Arc<S>,
        pages: Arc<P>,
        signer: LicenseSigner,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            store,
            pages,
            signer,
            limiter,
        }
    }

    /// Serve a page now.
    pub async fn deliver(&self, request: &PageRequest) -> Result<PageResponse> {
        self.deliver_at(request, now_millis()).await
    }

    /// Serve a page as of `now` (Unix ms).
    pub async fn deliver_at(&self, request: &PageRequest, now: i64) -> Result<PageResponse> {
        let result = self.check_and_fetch(request, now).await;
        if let Err(e) = &result {
            tracing::info!(
                user_id = %request.user_id,
                document_id = %request.document_id,
                page = request.page,
                error = %e,
                "page request rejected"
            );
        }
        let body = result?;

        let entry = AccessLogEntry::new(
            request.user_id,
            request.document_id,
            request.page,
            &request.client.ip,
            &request.client.user_agent,
            now,
        );
        if let Err(e) = self.store.append_access_log(&entry).await {
            tracing::warn!(
                document_id = %request.document_id,
                page = request.page,
                error = %e,
                "failed to write access log"
            );
        }

        Ok(PageResponse::new(body))
    }

    async fn check_and_fetch(&self, request: &PageRequest, now: i64) -> Result<Bytes> {
        if self.limiter.is_limited(&request.client.ip, now).await {
            return Err(VaultError::RateLimited);
        }

        let token = request.bearer_token().ok_or(LicenseError::Missing)?;
        let claims = self.signer.verify(token, now.div_euclid(1000))?;
        claims.authorize(request.document_id, request.page)?;

        let entitlement = self
            .store
            .get_entitlement(request.user_id, request.document_id)
            .await?;
        check_entitlement(entitlement.as_ref(), now)?;

        self.pages
            .get_page(request.document_id, request.page)
            .await?
            .ok_or_else(|| VaultError::NotFound("page".into()))
    }
}
