//! # PageVault Testkit
//!
//! Testing utilities for PageVault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: an in-memory vault with fixed secrets, sample pages, and a
//!   store whose access log can be made to fail
//! - **Generators**: Proptest strategies for keys, ids, TTLs, and licenses
//! - **End-to-end tests** (in `tests/`): pipeline to issuance to delivery
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use pagevault_testkit::fixtures::{sample_pages, TestVault, T0};
//! use pagevault_core::UserId;
//!
//! async fn example() {
//!     let tv = TestVault::new();
//!     let doc = tv.encrypt_pages("Guide", &sample_pages(3)).await;
//!     tv.entitle(UserId(1), doc, None).await;
//!
//!     let grant = tv.vault.issuer().issue_at(UserId(1), doc, T0).await.unwrap();
//!     let request = tv.request(UserId(1), doc, 2, &grant.license);
//!     let page = tv.vault.delivery().deliver_at(&request, T0).await.unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use pagevault_testkit::generators::LicenseParams;
//!
//! proptest! {
//!     #[test]
//!     fn license_covers_first_page(params: LicenseParams) {
//!         let claims = params.claims();
//!         prop_assert!(claims.authorize(claims.doc_id, 1).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{sample_pages, test_config, test_signer, FlakyStore, TestVault, T0};
pub use generators::LicenseParams;
