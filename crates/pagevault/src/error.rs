//! Error types for the PageVault services.

use pagevault_core::CoreError;
use pagevault_license::{EntitlementError, LicenseError};
use pagevault_store::StoreError;
use thiserror::Error;

/// Errors that can occur while issuing licenses or delivering pages.
///
/// Messages never contain key material, wrapped blobs or file-system paths.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Missing or malformed process configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A wrapped key or page failed authentication.
    #[error("integrity check failed")]
    Integrity,

    /// The user lacks, or has lost, access to the document.
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),

    /// The presented license is unusable or does not cover the request.
    #[error(transparent)]
    License(LicenseError),

    /// Too many requests from this client in the current window.
    #[error("rate limited")]
    RateLimited,

    /// A document or page does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A server-side invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LicenseError> for VaultError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::Configuration(msg) => VaultError::Configuration(msg),
            other => VaultError::License(other),
        }
    }
}

impl From<CoreError> for VaultError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration(msg) => VaultError::Configuration(msg),
            CoreError::Integrity | CoreError::Malformed(_) | CoreError::InvalidKeyLength { .. } => {
                VaultError::Integrity
            }
            CoreError::Encryption(msg) => VaultError::Internal(msg),
        }
    }
}

/// Stable classification of a [`VaultError`] for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Integrity,
    Forbidden,
    EntitlementExpired,
    InvalidLicense,
    LicenseOutOfScope,
    RateLimited,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// The HTTP status a web front end should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Forbidden | ErrorKind::EntitlementExpired | ErrorKind::LicenseOutOfScope => {
                403
            }
            ErrorKind::InvalidLicense => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::Configuration | ErrorKind::Integrity | ErrorKind::Internal => 500,
        }
    }
}

impl VaultError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Configuration(_) => ErrorKind::Configuration,
            VaultError::Integrity => ErrorKind::Integrity,
            VaultError::Entitlement(EntitlementError::Forbidden) => ErrorKind::Forbidden,
            VaultError::Entitlement(EntitlementError::Expired { .. }) => {
                ErrorKind::EntitlementExpired
            }
            VaultError::License(e) if e.is_invalid() => ErrorKind::InvalidLicense,
            VaultError::License(_) => ErrorKind::LicenseOutOfScope,
            VaultError::RateLimited => ErrorKind::RateLimited,
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::Store(_) | VaultError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().status_code()`.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Result type for PageVault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pagevault_core::{DocumentId, PageRange};

    #[test]
    fn test_kinds_and_statuses() {
        let cases: Vec<(VaultError, ErrorKind, u16)> = vec![
            (EntitlementError::Forbidden.into(), ErrorKind::Forbidden, 403),
            (
                EntitlementError::Expired { expires_at: 1 }.into(),
                ErrorKind::EntitlementExpired,
                403,
            ),
            (LicenseError::Missing.into(), ErrorKind::InvalidLicense, 401),
            (
                LicenseError::Expired { exp: 10 }.into(),
                ErrorKind::InvalidLicense,
                401,
            ),
            (
                LicenseError::DocumentMismatch {
                    licensed: DocumentId(1),
                    requested: DocumentId(2),
                }
                .into(),
                ErrorKind::LicenseOutOfScope,
                403,
            ),
            (
                LicenseError::PageOutOfRange {
                    page: 4,
                    range: PageRange::new(1, 3).unwrap(),
                }
                .into(),
                ErrorKind::LicenseOutOfScope,
                403,
            ),
            (VaultError::RateLimited, ErrorKind::RateLimited, 429),
            (VaultError::NotFound("page".into()), ErrorKind::NotFound, 404),
            (CoreError::Integrity.into(), ErrorKind::Integrity, 500),
            (
                LicenseError::Configuration("JWT_SECRET missing".into()).into(),
                ErrorKind::Configuration,
                500,
            ),
        ];

        for (err, kind, status) in cases {
            assert_eq!(err.kind(), kind, "{err}");
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_integrity_message_is_fixed() {
        let err: VaultError = CoreError::Malformed("wrapped key too short".into()).into();
        assert_eq!(err.to_string(), "integrity check failed");
    }
}
