//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error from the page store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Target already exists and must not be overwritten.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock guarding the connection was poisoned.
    #[error("store lock poisoned")]
    Poisoned,

    /// A blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
