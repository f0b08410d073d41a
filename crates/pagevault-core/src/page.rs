//! Encrypted page envelopes.
//!
//! Every page file holds `nonce(16) || tag(16) || ciphertext`, AES-256-GCM
//! under the document's content key. The 16-byte nonce differs from the
//! 12-byte nonce used for key wrapping; page files already on disk depend
//! on it.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};

use crate::crypto::{random_nonce, ContentKey, CONTENT_KEY_LEN, TAG_LEN};
use crate::error::{CoreError, Result};

/// AES-256-GCM with a 16-byte nonce.
type PageCipher = AesGcm<Aes256, U16>;

/// Nonce length used for page encryption.
pub const PAGE_NONCE_LEN: usize = 16;

/// Bytes preceding the ciphertext in a page file.
pub const PAGE_HEADER_LEN: usize = PAGE_NONCE_LEN + TAG_LEN;

/// A borrowed view of a sealed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEnvelope<'a> {
    pub nonce: &'a [u8],
    pub tag: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl<'a> PageEnvelope<'a> {
    /// Split a page file into its parts.
    pub fn parse(sealed: &'a [u8]) -> Result<Self> {
        if sealed.len() < PAGE_HEADER_LEN {
            return Err(CoreError::Malformed(format!(
                "page envelope too short: {} bytes",
                sealed.len()
            )));
        }
        let (nonce, rest) = sealed.split_at(PAGE_NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        Ok(Self {
            nonce,
            tag,
            ciphertext,
        })
    }
}

fn cipher(key: &ContentKey) -> Result<PageCipher> {
    PageCipher::new_from_slice(key.as_bytes()).map_err(|_| CoreError::InvalidKeyLength {
        expected: CONTENT_KEY_LEN,
        got: key.as_bytes().len(),
    })
}

/// Encrypt one page image with a fresh random nonce.
pub fn encrypt_page(key: &ContentKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;
    let nonce = random_nonce::<PAGE_NONCE_LEN>();

    let mut sealed = Vec::with_capacity(PAGE_HEADER_LEN + plaintext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&[0u8; TAG_LEN]);
    sealed.extend_from_slice(plaintext);

    let tag = cipher
        .encrypt_in_place_detached(
            Nonce::<U16>::from_slice(&nonce),
            b"",
            &mut sealed[PAGE_HEADER_LEN..],
        )
        .map_err(|_| CoreError::Encryption("page encryption failed".into()))?;
    sealed[PAGE_NONCE_LEN..PAGE_HEADER_LEN].copy_from_slice(&tag);

    Ok(sealed)
}

/// Decrypt a page file using its embedded nonce and tag.
///
/// This is what the client does after receiving a license. The server side
/// only uses it for self-checks and tests.
pub fn decrypt_page(key: &ContentKey, sealed: &[u8]) -> Result<Vec<u8>> {
    let envelope = PageEnvelope::parse(sealed)?;
    let cipher = cipher(key)?;

    let mut buffer = envelope.ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(envelope.nonce),
            b"",
            &mut buffer,
            Tag::from_slice(envelope.tag),
        )
        .map_err(|_| CoreError::Integrity)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_page_round_trip() {
        let key = ContentKey::generate();
        let image = b"\x89PNG\r\n\x1a\n fake page".to_vec();
        let sealed = encrypt_page(&key, &image).unwrap();
        assert_eq!(sealed.len(), PAGE_HEADER_LEN + image.len());
        assert_eq!(decrypt_page(&key, &sealed).unwrap(), image);
    }

    #[test]
    fn test_empty_page() {
        let key = ContentKey::generate();
        let sealed = encrypt_page(&key, b"").unwrap();
        assert_eq!(sealed.len(), PAGE_HEADER_LEN);
        assert!(decrypt_page(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt_page(&ContentKey::generate(), b"page").unwrap();
        let err = decrypt_page(&ContentKey::generate(), &sealed).unwrap_err();
        assert!(matches!(err, CoreError::Integrity));
    }

    #[test]
    fn test_short_envelope_is_malformed() {
        let err = decrypt_page(&ContentKey::generate(), &[0u8; 31]).unwrap_err();
        assert!(matches!(err, CoreError::Malformed(_)));
    }

    #[test]
    fn test_envelope_parse() {
        let key = ContentKey::generate();
        let sealed = encrypt_page(&key, b"abc").unwrap();
        let envelope = PageEnvelope::parse(&sealed).unwrap();
        assert_eq!(envelope.nonce.len(), PAGE_NONCE_LEN);
        assert_eq!(envelope.tag.len(), TAG_LEN);
        assert_eq!(envelope.ciphertext.len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_any_single_byte_flip_detected(
            image in prop::collection::vec(any::<u8>(), 1..512),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = ContentKey::generate();
            let mut sealed = encrypt_page(&key, &image).unwrap();
            prop_assert_eq!(decrypt_page(&key, &sealed).unwrap(), image);

            // Flip a byte anywhere in the tag or ciphertext.
            let target = PAGE_NONCE_LEN + index.index(sealed.len() - PAGE_NONCE_LEN);
            sealed[target] ^= 1 << bit;
            prop_assert!(matches!(decrypt_page(&key, &sealed), Err(CoreError::Integrity)));
        }
    }
}
