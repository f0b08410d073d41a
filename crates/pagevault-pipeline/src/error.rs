//! Error types for the encryption pipeline.

use std::path::PathBuf;

use pagevault_core::CoreError;
use pagevault_store::StoreError;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input path does not exist.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input exists but is neither a PDF nor a directory.
    #[error("unsupported input (expected a .pdf file or an image directory): {}", .0.display())]
    UnsupportedInput(PathBuf),

    /// The input yielded no pages.
    #[error("no pages found: {0}")]
    NoPages(String),

    /// More pages than a document can hold.
    #[error("too many pages: {0}")]
    TooManyPages(usize),

    /// A required external tool is not installed.
    #[error("{tool} not found. {hint}")]
    ToolMissing { tool: String, hint: String },

    /// An external tool ran but failed.
    #[error("{tool} failed: {detail}")]
    ToolFailed { tool: String, detail: String },

    /// A page image could not be read.
    #[error("failed to read page {page}: {source}")]
    ReadPage {
        page: u32,
        #[source]
        source: std::io::Error,
    },

    /// The post-write self-check failed.
    #[error("integrity self-check failed: {0}")]
    SelfCheck(String),

    /// Published page count does not match the document record.
    #[error("page count mismatch: document has {expected}, storage has {found}")]
    PageCountMismatch { expected: u32, found: u32 },

    /// Key or page cryptography failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
