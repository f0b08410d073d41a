//! License claims.
//!
//! A license binds one document, its raw content key, the permitted page
//! range, and an expiry. It exists only inside a signed token and the
//! response that issued it; it is never persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use pagevault_core::{ContentKey, DocumentId, PageRange};

use crate::error::{LicenseError, Result};
use crate::ttl::LicenseTtl;

/// The claims carried by a license token.
///
/// Field names match the token payload: `sub`, `docId`, `key`, `pages`,
/// `iat`, `exp`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseClaims {
    /// `doc:<documentId>`.
    pub sub: String,
    #[serde(rename = "docId")]
    pub doc_id: DocumentId,
    /// Standard base64 of the content key.
    pub key: String,
    pub pages: PageRange,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expires at (Unix seconds).
    pub exp: i64,
}

impl LicenseClaims {
    /// Build the claims for a document, valid from `issued_at` (Unix
    /// seconds) for `ttl`.
    pub fn new(
        doc_id: DocumentId,
        key: &ContentKey,
        pages: PageRange,
        issued_at: i64,
        ttl: LicenseTtl,
    ) -> Self {
        Self {
            sub: subject_for(doc_id),
            doc_id,
            key: key.to_base64(),
            pages,
            iat: issued_at,
            exp: issued_at + ttl.as_secs(),
        }
    }

    /// Whether the license has expired at `now` (Unix seconds).
    ///
    /// A license is valid strictly before `exp`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Check that this license covers `page` of `document_id`.
    pub fn authorize(&self, document_id: DocumentId, page: u32) -> Result<()> {
        if self.doc_id != document_id || self.sub != subject_for(document_id) {
            return Err(LicenseError::DocumentMismatch {
                licensed: self.doc_id,
                requested: document_id,
            });
        }
        if !self.pages.contains(page) {
            return Err(LicenseError::PageOutOfRange {
                page,
                range: self.pages,
            });
        }
        Ok(())
    }

    /// Decode the embedded content key.
    pub fn content_key(&self) -> Result<ContentKey> {
        ContentKey::from_base64(&self.key)
            .map_err(|_| LicenseError::Malformed("embedded key is invalid".into()))
    }
}

impl fmt::Debug for LicenseClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseClaims")
            .field("sub", &self.sub)
            .field("doc_id", &self.doc_id)
            .field("key", &"<redacted>")
            .field("pages", &self.pages)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// The `sub` claim for a document.
pub fn subject_for(doc_id: DocumentId) -> String {
    format!("doc:{doc_id}")
}
