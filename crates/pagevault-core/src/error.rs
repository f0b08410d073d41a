//! Error types for PageVault core.

use thiserror::Error;

/// Core errors raised by key handling and page encryption.
///
/// None of the variants carry key bytes, nonces or ciphertext. Messages are
/// safe to surface to operators and callers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The master key (or another secret) is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Authentication tag verification failed.
    ///
    /// Either the wrong key was used or the data was corrupted.
    #[error("integrity check failed")]
    Integrity,

    /// The input is structurally invalid (bad base64, too short, etc.).
    #[error("malformed data: {0}")]
    Malformed(String),

    /// A key had the wrong length.
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// The cipher refused to encrypt.
    #[error("encryption error: {0}")]
    Encryption(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
