//! # PageVault Core
//!
//! Pure primitives for PageVault: master key loading, content key wrapping,
//! page envelopes, records, and rate limiting.
//!
//! This crate contains no storage and no networking. Everything here is
//! computation over keys and byte buffers.
//!
//! ## Key Types
//!
//! - [`MasterKey`] - Process-wide key that wraps content keys
//! - [`ContentKey`] - Per-document key that encrypts pages
//! - [`Document`] / [`Entitlement`] / [`AccessLogEntry`] - Persistent records
//! - [`PageRange`] - Inclusive 1-based page range carried by licenses
//! - [`RateLimiter`] - Injectable per-client rate limiting capability
//!
//! ## Wire Formats
//!
//! - Wrapped key (base64): `nonce(12) || tag(16) || ciphertext`
//! - Page file: `nonce(16) || tag(16) || ciphertext`
//!
//! Both use AES-256-GCM without associated data.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagevault_core::{
//!     decrypt_page, encrypt_page, unwrap_content_key, wrap_content_key, ContentKey, MasterKey,
//! };
//!
//! let master = MasterKey::from_env().unwrap();
//! let key = ContentKey::generate();
//! let wrapped = wrap_content_key(&master, &key).unwrap();
//!
//! let sealed = encrypt_page(&key, b"page image bytes").unwrap();
//! let recovered = unwrap_content_key(&master, &wrapped).unwrap();
//! assert_eq!(decrypt_page(&recovered, &sealed).unwrap(), b"page image bytes");
//! ```

pub mod crypto;
pub mod error;
pub mod master_key;
pub mod page;
pub mod rate_limit;
pub mod records;
pub mod types;
pub mod wrap;

pub use crypto::{ContentKey, CONTENT_KEY_LEN, TAG_LEN};
pub use error::{CoreError, Result};
pub use master_key::{MasterKey, MASTER_KEY_ENV, MASTER_KEY_LEN};
pub use page::{decrypt_page, encrypt_page, PageEnvelope, PAGE_HEADER_LEN, PAGE_NONCE_LEN};
pub use rate_limit::{FixedWindowLimiter, RateLimitPolicy, RateLimiter};
pub use records::{
    truncate_chars, AccessLogEntry, Document, Entitlement, NewDocument, MAX_LOGGED_IP_LEN,
    MAX_LOGGED_USER_AGENT_LEN,
};
pub use types::{now_millis, DocumentId, PageRange, UserId};
pub use wrap::{unwrap_content_key, wrap_content_key, WRAP_NONCE_LEN};
