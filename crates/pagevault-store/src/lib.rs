//! # PageVault Store
//!
//! Storage abstraction for PageVault. Provides trait-based interfaces for
//! document metadata and encrypted page files, with SQLite, filesystem, and
//! in-memory implementations.
//!
//! ## Overview
//!
//! Metadata (documents, entitlements, access log) lives behind the
//! [`Store`] trait; encrypted page blobs live behind the [`PageStore`]
//! trait. The services are generic over both.
//!
//! ## Key Types
//!
//! - [`Store`] - Async trait for documents, entitlements, and the access log
//! - [`PageStore`] - Async trait for staged and published page files
//! - [`SqliteStore`] - SQLite-based persistent metadata storage
//! - [`FsPageStore`] - One file per page under a root directory
//! - [`MemoryStore`] / [`MemoryPageStore`] - In-memory storage for tests
//! - [`SqliteRateLimiter`] - Rate limit counters shared through SQLite
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagevault_store::{FsPageStore, PageStore, SqliteStore, Store};
//! use pagevault_core::{DocumentId, UserId};
//!
//! async fn example() {
//!     let store = SqliteStore::open("pagevault.db").unwrap();
//!     let pages = FsPageStore::new("secure_docs");
//!
//!     let doc = store.get_document(DocumentId(1)).await.unwrap();
//!     let entitlement = store.get_entitlement(UserId(7), DocumentId(1)).await.unwrap();
//!     let page = pages.get_page(DocumentId(1), 1).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Staged pages**: pages are written to a staging area and promoted as a
//!   set, so a published document is never partially populated
//! - **No overwrite**: promoting onto an existing page set fails
//! - **Fail-open limiter**: the SQLite limiter lets requests through if its
//!   storage fails

pub mod error;
pub mod limiter;
pub mod memory;
pub mod migration;
pub mod pages;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use limiter::SqliteRateLimiter;
pub use memory::{MemoryPageStore, MemoryStore};
pub use pages::{FsPageStore, PAGE_FILE_EXT};
pub use sqlite::SqliteStore;
pub use traits::{PageStore, Store, StoreExt};
