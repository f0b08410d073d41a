//! License issuance.
//!
//! Each request moves through
//! `Received -> EntitlementChecked -> KeyUnwrapped -> TokenIssued`, or stops
//! at the first failing gate.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use pagevault_core::{now_millis, unwrap_content_key, DocumentId, MasterKey, PageRange, UserId};
use pagevault_license::{check_entitlement, LicenseClaims, LicenseSigner, LicenseTtl};
use pagevault_store::Store;

use crate::error::{ErrorKind, Result, VaultError};

/// Progress of one issuance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceStage {
    Received,
    EntitlementChecked,
    KeyUnwrapped,
    TokenIssued,
}

impl IssuanceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceStage::Received => "received",
            IssuanceStage::EntitlementChecked => "entitlement_checked",
            IssuanceStage::KeyUnwrapped => "key_unwrapped",
            IssuanceStage::TokenIssued => "token_issued",
        }
    }
}

impl fmt::Display for IssuanceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly issued license.
///
/// Carries the signed token and, next to it, the content key, page range and
/// expiry in clear form. Serializes as `{license, exp, key, pages}`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LicenseGrant {
    /// Signed compact token.
    pub license: String,
    /// Expiry (Unix seconds).
    pub exp: i64,
    /// Standard base64 content key.
    pub key: String,
    pub pages: PageRange,
}

impl fmt::Debug for LicenseGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseGrant")
            .field("license", &"<redacted>")
            .field("exp", &self.exp)
            .field("key", &"<redacted>")
            .field("pages", &self.pages)
            .finish()
    }
}

/// Issues licenses for entitled users.
pub struct LicenseIssuer<S: Store> {
    store: Arc<S>,
    master_key: Arc<MasterKey>,
    signer: LicenseSigner,
    ttl: LicenseTtl,
}

impl<S: Store> LicenseIssuer<S> {
    /// Create an issuer.
    pub fn new(
        store: Arc<S>,
        master_key: Arc<MasterKey>,
        signer: LicenseSigner,
        ttl: LicenseTtl,
    ) -> Self {
        Self {
            store,
            master_key,
            signer,
            ttl,
        }
    }

    /// The configured license lifetime.
    pub fn ttl(&self) -> LicenseTtl {
        self.ttl
    }

    /// Issue a license for `document_id` to `user_id` now.
    pub async fn issue(&self, user_id: UserId, document_id: DocumentId) -> Result<LicenseGrant> {
        self.issue_at(user_id, document_id, now_millis()).await
    }

    /// Issue a license as of `now` (Unix ms).
    pub async fn issue_at(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        now: i64,
    ) -> Result<LicenseGrant> {
        let mut stage = IssuanceStage::Received;
        tracing::debug!(user_id = %user_id, document_id = %document_id, stage = %stage, "license requested");

        let result = self.advance(user_id, document_id, now, &mut stage).await;
        if let Err(e) = &result {
            match e.kind() {
                ErrorKind::Integrity | ErrorKind::Internal | ErrorKind::Configuration => {
                    tracing::warn!(
                        user_id = %user_id,
                        document_id = %document_id,
                        stage = %stage,
                        error = %e,
                        "license issuance failed"
                    );
                }
                _ => {
                    tracing::info!(
                        user_id = %user_id,
                        document_id = %document_id,
                        stage = %stage,
                        error = %e,
                        "license rejected"
                    );
                }
            }
        }
        result
    }

    async fn advance(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        now: i64,
        stage: &mut IssuanceStage,
    ) -> Result<LicenseGrant> {
        let entitlement = self.store.get_entitlement(user_id, document_id).await?;
        check_entitlement(entitlement.as_ref(), now)?;
        *stage = IssuanceStage::EntitlementChecked;
        tracing::debug!(document_id = %document_id, stage = %stage, "entitlement verified");

        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("document".into()))?;

        let content_key = unwrap_content_key(&self.master_key, &document.wrapped_key)?;
        *stage = IssuanceStage::KeyUnwrapped;
        tracing::debug!(document_id = %document_id, stage = %stage, "content key unwrapped");

        let pages = PageRange::whole(document.page_count)
            .ok_or_else(|| VaultError::Internal("document has no pages".into()))?;
        let claims = LicenseClaims::new(document_id, &content_key, pages, now.div_euclid(1000), self.ttl);
        let license = self.signer.sign(&claims)?;
        *stage = IssuanceStage::TokenIssued;
        tracing::debug!(document_id = %document_id, stage = %stage, exp = claims.exp, "license issued");

        Ok(LicenseGrant {
            license,
            exp: claims.exp,
            key: claims.key.clone(),
            pages,
        })
    }
}
