//! Error types for entitlement checks and licenses.

use pagevault_core::{DocumentId, PageRange};
use thiserror::Error;

/// Errors that can occur while issuing or verifying a license.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The signing secret is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No license was presented.
    #[error("missing license")]
    Missing,

    /// The token is not a well-formed license.
    #[error("malformed license: {0}")]
    Malformed(String),

    /// The signature does not match.
    #[error("invalid license signature")]
    BadSignature,

    /// The token header names an algorithm other than HS256.
    #[error("unsupported license algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The license is past its expiry.
    #[error("license expired")]
    Expired {
        /// Expiry (Unix seconds).
        exp: i64,
    },

    /// The license was issued for another document.
    #[error("license is for document {licensed}, not {requested}")]
    DocumentMismatch {
        licensed: DocumentId,
        requested: DocumentId,
    },

    /// The requested page is outside the licensed range.
    #[error("page {page} outside licensed range {range}")]
    PageOutOfRange { page: u32, range: PageRange },
}

impl LicenseError {
    /// Whether the license itself is unusable (as opposed to being valid but
    /// presented for something it does not cover).
    pub fn is_invalid(&self) -> bool {
        !matches!(
            self,
            LicenseError::DocumentMismatch { .. }
                | LicenseError::PageOutOfRange { .. }
                | LicenseError::Configuration(_)
        )
    }
}

/// The user lacks, or has lost, access to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// No entitlement exists.
    #[error("forbidden")]
    Forbidden,

    /// The entitlement lapsed.
    #[error("entitlement expired")]
    Expired {
        /// When it lapsed (Unix ms).
        expires_at: i64,
    },
}

/// Result type for license operations.
pub type Result<T> = std::result::Result<T, LicenseError>;
