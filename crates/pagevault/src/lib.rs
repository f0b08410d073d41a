//! # PageVault
//!
//! The unified API for PageVault: key custody, short-lived licenses, and
//! encrypted page delivery for paid documents.
//!
//! ## Overview
//!
//! Every page of a document is encrypted at rest under a per-document
//! content key, and the content key is stored wrapped under a process-wide
//! master key. Readers never get pages in the clear from the server:
//!
//! - **Pipeline**: turns a PDF or image set into encrypted pages
//! - **Issuance**: checks an entitlement and hands out a signed license that
//!   carries the content key
//! - **Delivery**: checks the license (and the entitlement, again) and
//!   streams ciphertext
//!
//! ## Key Concepts
//!
//! - **Entitlement**: a user's right to a document, possibly time-bounded.
//!   Owned by the storefront.
//! - **License**: HS256 token binding a document, its content key, the page
//!   range, and a short expiry. Never persisted.
//! - **Rate limiting**: abuse dampening per client IP. Each process keeps
//!   its own counters unless the SQLite backend is selected.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagevault::{ClientInfo, PageRequest, Vault, VaultConfig};
//! use pagevault::core::{DocumentId, UserId};
//!
//! async fn example() {
//!     let config = VaultConfig::from_env().unwrap();
//!     let vault = Vault::open(&config).unwrap();
//!
//!     let grant = vault.issue_license(UserId(7), DocumentId(1)).await.unwrap();
//!
//!     let client = ClientInfo::from_headers(Some("203.0.113.7"), None, Some("Reader/1.0"));
//!     let request = PageRequest::new(UserId(7), DocumentId(1), 1, client).bearer(&grant.license);
//!     let page = vault.deliver_page(&request).await.unwrap();
//!     assert_eq!(page.content_type, "application/octet-stream");
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `pagevault::core` - Keys, envelopes, records, rate limiting
//! - `pagevault::store` - Storage traits, SQLite and filesystem backends
//! - `pagevault::license` - Entitlement gate and license tokens
//! - `pagevault::pipeline` - Document encryption pipeline

pub mod config;
pub mod delivery;
pub mod error;
pub mod issuance;
pub mod request;
pub mod vault;
pub mod viewer;

// Re-export component crates
pub use pagevault_core as core;
pub use pagevault_license as license;
pub use pagevault_pipeline as pipeline;
pub use pagevault_store as store;

// Re-export main types for convenience
pub use config::{RateLimitBackend, VaultConfig};
pub use delivery::{PageDelivery, PageResponse, PAGE_CACHE_CONTROL, PAGE_CONTENT_TYPE};
pub use error::{ErrorKind, Result, VaultError};
pub use issuance::{IssuanceStage, LicenseGrant, LicenseIssuer};
pub use request::{parse_bearer, ClientInfo, PageRequest, UNKNOWN_CLIENT};
pub use vault::Vault;
pub use viewer::{ViewerIdentity, ViewerManifest};
