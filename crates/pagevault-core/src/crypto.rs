//! Document content keys.
//!
//! Each document gets one random 256-bit content key. It encrypts every
//! page of that document and is stored only in wrapped form.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Length of a content key in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// Length of an AES-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// A 256-bit symmetric key for AES-256-GCM page encryption.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != CONTENT_KEY_LEN {
            return Err(CoreError::InvalidKeyLength {
                expected: CONTENT_KEY_LEN,
                got: slice.len(),
            });
        }
        let mut bytes = [0u8; CONTENT_KEY_LEN];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }

    /// Standard base64, as embedded in licenses.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parse standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded)
            .map_err(|_| CoreError::Malformed("content key is not valid base64".into()))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// Fill a fresh random nonce.
pub(crate) fn random_nonce<const N: usize>() -> [u8; N] {
    let mut nonce = [0u8; N];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
