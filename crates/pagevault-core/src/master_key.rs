//! The process-wide master key.
//!
//! The master key is loaded once at process start and handed by reference
//! to every component that wraps or unwraps content keys. Rotating it
//! requires a restart.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Environment variable holding the master key.
pub const MASTER_KEY_ENV: &str = "APP_MASTER_KEY";

/// Length of the master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// A 256-bit key used only to wrap and unwrap document content keys.
///
/// Never used to encrypt page content directly. The bytes are zeroized on
/// drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; MASTER_KEY_LEN]);

impl MasterKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.0
    }

    /// Parse a configuration string.
    ///
    /// Accepted forms, tried in order:
    ///
    /// 1. exactly 64 hex characters
    /// 2. base64 (standard or URL-safe, padded or not) decoding to 32 bytes
    /// 3. a raw string of exactly 32 bytes, used verbatim
    ///
    /// Anything else is a [`CoreError::Configuration`].
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(CoreError::Configuration(format!("{MASTER_KEY_ENV} missing")));
        }

        if raw.len() == 2 * MASTER_KEY_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            let mut bytes = [0u8; MASTER_KEY_LEN];
            hex::decode_to_slice(raw, &mut bytes)
                .map_err(|_| CoreError::Configuration(format!("{MASTER_KEY_ENV} is not valid hex")))?;
            return Ok(Self(bytes));
        }

        if let Some(bytes) = decode_base64_key(raw) {
            return Ok(Self(bytes));
        }

        if raw.len() == MASTER_KEY_LEN {
            let mut bytes = [0u8; MASTER_KEY_LEN];
            bytes.copy_from_slice(raw.as_bytes());
            return Ok(Self(bytes));
        }

        Err(CoreError::Configuration(format!(
            "{MASTER_KEY_ENV} must be 32 bytes (hex/base64/utf8)"
        )))
    }

    /// Load from the `APP_MASTER_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        match std::env::var(MASTER_KEY_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Err(CoreError::Configuration(format!("{MASTER_KEY_ENV} missing"))),
        }
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

fn decode_base64_key(raw: &str) -> Option<[u8; MASTER_KEY_LEN]> {
    for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(mut decoded) = engine.decode(raw) {
            if decoded.len() == MASTER_KEY_LEN {
                let mut bytes = [0u8; MASTER_KEY_LEN];
                bytes.copy_from_slice(&decoded);
                decoded.zeroize();
                return Some(bytes);
            }
            decoded.zeroize();
        }
    }
    None
}
