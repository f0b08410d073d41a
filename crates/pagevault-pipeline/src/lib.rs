//! # PageVault Pipeline
//!
//! Offline tool that turns a source document into encrypted, individually
//! addressable pages.
//!
//! ## Overview
//!
//! A run rasterizes a PDF (or reads a directory of page images), generates a
//! fresh content key, wraps it under the master key, records the document,
//! and writes one encrypted file per page. The wrapped key is unwrapped
//! again and compared before the pages are published.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pagevault_core::MasterKey;
//! use pagevault_pipeline::{EncryptionPipeline, PipelineOptions, PipelineOutcome};
//! use pagevault_store::{FsPageStore, SqliteStore};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("pagevault.db").unwrap());
//!     let pages = Arc::new(FsPageStore::new("secure_docs"));
//!     let master = Arc::new(MasterKey::from_env().unwrap());
//!
//!     let pipeline = EncryptionPipeline::new(store, pages, master);
//!     let outcome = pipeline
//!         .run(&PipelineOptions::new("Field Guide", "guide.pdf"))
//!         .await
//!         .unwrap();
//!     if let PipelineOutcome::Encrypted(doc) = outcome {
//!         println!("document {} with {} pages", doc.document_id, doc.page_count);
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Dry run** touches neither the master key nor persistence
//! - **Staging**: pages are published only after the self-check passes, and
//!   a failed run removes its document record

pub mod error;
pub mod pipeline;
pub mod rasterizer;
pub mod source;

pub use error::{PipelineError, Result};
pub use pipeline::{dry_run, EncryptedDocument, EncryptionPipeline, PipelineOptions, PipelineOutcome};
pub use rasterizer::{PopplerRasterizer, Rasterizer, DEFAULT_RESOLUTION};
pub use source::{collect_images, PageSource, DEFAULT_IMAGE_EXT};
