//! # PageVault License
//!
//! Entitlement checks and short-lived signed licenses.
//!
//! ## Overview
//!
//! A license grants page-range access to one document for a short time and
//! carries the document's content key so the client can decrypt pages
//! locally. Licenses are HS256-signed compact tokens and are never stored.
//!
//! ## Key Concepts
//!
//! - **Entitlement**: storefront record saying a user may view a document;
//!   checked at issuance and again on every page request
//! - **License**: signed claims binding document, key, page range, expiry
//! - **TTL**: license lifetime, `(0, 3600]` seconds, default 60
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagevault_core::{ContentKey, DocumentId, PageRange};
//! use pagevault_license::{LicenseClaims, LicenseSigner, LicenseTtl, SigningSecret};
//!
//! let signer = LicenseSigner::new(SigningSecret::from_env().unwrap());
//! let claims = LicenseClaims::new(
//!     DocumentId(1),
//!     &ContentKey::generate(),
//!     PageRange::whole(12).unwrap(),
//!     1_700_000_000,
//!     LicenseTtl::from_env(),
//! );
//! let token = signer.sign(&claims).unwrap();
//! let verified = signer.verify(&token, 1_700_000_030).unwrap();
//! verified.authorize(DocumentId(1), 3).unwrap();
//! ```

pub mod claims;
pub mod entitlement;
pub mod error;
pub mod token;
pub mod ttl;

pub use claims::{subject_for, LicenseClaims};
pub use entitlement::check_entitlement;
pub use error::{EntitlementError, LicenseError, Result};
pub use token::{LicenseSigner, SigningSecret, ALGORITHM, SIGNING_SECRET_ENV};
pub use ttl::{LicenseTtl, DEFAULT_LICENSE_TTL_SECS, LICENSE_TTL_ENV, MAX_LICENSE_TTL_SECS};
