//! Wrapping content keys under the master key.
//!
//! Wire format (base64): `nonce(12) || tag(16) || ciphertext`, AES-256-GCM
//! with no associated data.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroize;

use crate::crypto::{random_nonce, ContentKey, TAG_LEN};
use crate::error::{CoreError, Result};
use crate::master_key::{MasterKey, MASTER_KEY_LEN};

/// Nonce length used for key wrapping.
///
/// Pages use a 16-byte nonce instead (see [`crate::page`]). Both layouts are
/// kept as-is so existing data stays readable.
pub const WRAP_NONCE_LEN: usize = 12;

const WRAP_HEADER_LEN: usize = WRAP_NONCE_LEN + TAG_LEN;

fn cipher(master: &MasterKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(master.as_bytes()).map_err(|_| CoreError::InvalidKeyLength {
        expected: MASTER_KEY_LEN,
        got: master.as_bytes().len(),
    })
}

/// Wrap a content key, producing the base64 string stored on the document.
///
/// A fresh random nonce is drawn on every call.
pub fn wrap_content_key(master: &MasterKey, key: &ContentKey) -> Result<String> {
    let cipher = cipher(master)?;
    let nonce = random_nonce::<WRAP_NONCE_LEN>();

    let mut out = Vec::with_capacity(WRAP_HEADER_LEN + key.as_bytes().len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&[0u8; TAG_LEN]);
    out.extend_from_slice(key.as_bytes());

    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut out[WRAP_HEADER_LEN..])
        .map_err(|_| CoreError::Encryption("key wrap failed".into()))?;
    out[WRAP_NONCE_LEN..WRAP_HEADER_LEN].copy_from_slice(&tag);

    Ok(STANDARD.encode(out))
}

/// Recover a content key from its wrapped form.
///
/// A tag mismatch (wrong master key, corrupted blob) yields
/// [`CoreError::Integrity`].
pub fn unwrap_content_key(master: &MasterKey, wrapped: &str) -> Result<ContentKey> {
    let data = STANDARD
        .decode(wrapped.trim())
        .map_err(|_| CoreError::Malformed("wrapped key is not valid base64".into()))?;
    if data.len() < WRAP_HEADER_LEN {
        return Err(CoreError::Malformed(format!(
            "wrapped key too short: {} bytes",
            data.len()
        )));
    }

    let (nonce, rest) = data.split_at(WRAP_NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let cipher = cipher(master)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer, Tag::from_slice(tag))
        .map_err(|_| CoreError::Integrity)?;

    let key = ContentKey::from_slice(&buffer);
    buffer.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_unwrap() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let key = ContentKey::generate();
        let wrapped = wrap_content_key(&master, &key).unwrap();
        assert_eq!(unwrap_content_key(&master, &wrapped).unwrap(), key);
    }

    #[test]
    fn test_wrapped_layout() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let wrapped = wrap_content_key(&master, &ContentKey::generate()).unwrap();
        let raw = STANDARD.decode(wrapped).unwrap();
        assert_eq!(raw.len(), WRAP_NONCE_LEN + TAG_LEN + 32);
    }

    #[test]
    fn test_fresh_nonce_per_wrap() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let key = ContentKey::from_bytes([5u8; 32]);
        let a = STANDARD.decode(wrap_content_key(&master, &key).unwrap()).unwrap();
        let b = STANDARD.decode(wrap_content_key(&master, &key).unwrap()).unwrap();
        assert_ne!(a[..WRAP_NONCE_LEN], b[..WRAP_NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tampered_tag_is_integrity_error() {
        let master = MasterKey::from_bytes([1u8; 32]);
        let wrapped = wrap_content_key(&master, &ContentKey::generate()).unwrap();
        let mut raw = STANDARD.decode(wrapped).unwrap();
        raw[WRAP_NONCE_LEN] ^= 0x01;
        let err = unwrap_content_key(&master, &STANDARD.encode(raw)).unwrap_err();
        assert!(matches!(err, CoreError::Integrity));
    }

    #[test]
    fn test_malformed_inputs() {
        let master = MasterKey::from_bytes([1u8; 32]);
        assert!(matches!(
            unwrap_content_key(&master, "not base64!!").unwrap_err(),
            CoreError::Malformed(_)
        ));
        assert!(matches!(
            unwrap_content_key(&master, &STANDARD.encode([0u8; 20])).unwrap_err(),
            CoreError::Malformed(_)
        ));
    }

    #[test]
    fn test_error_message_has_no_key_material() {
        let master = MasterKey::from_bytes([0xab; 32]);
        let other = MasterKey::from_bytes([0xcd; 32]);
        let wrapped = wrap_content_key(&master, &ContentKey::from_bytes([0xee; 32])).unwrap();
        let msg = unwrap_content_key(&other, &wrapped).unwrap_err().to_string();
        assert_eq!(msg, "integrity check failed");
    }

    proptest! {
        #[test]
        fn test_round_trip_any_keys(master in any::<[u8; 32]>(), content in any::<[u8; 32]>()) {
            let master = MasterKey::from_bytes(master);
            let key = ContentKey::from_bytes(content);
            let wrapped = wrap_content_key(&master, &key).unwrap();
            prop_assert_eq!(unwrap_content_key(&master, &wrapped).unwrap(), key);
        }

        #[test]
        fn test_wrong_master_key_rejected(
            m1 in any::<[u8; 32]>(),
            m2 in any::<[u8; 32]>(),
            content in any::<[u8; 32]>(),
        ) {
            prop_assume!(m1 != m2);
            let wrapped = wrap_content_key(&MasterKey::from_bytes(m1), &ContentKey::from_bytes(content)).unwrap();
            let result = unwrap_content_key(&MasterKey::from_bytes(m2), &wrapped);
            prop_assert!(matches!(result, Err(CoreError::Integrity)));
        }
    }
}
