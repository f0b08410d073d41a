//! Signed license tokens.
//!
//! Tokens use the compact JWT layout with HS256:
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(HMAC-SHA256)
//! ```
//!
//! The header is always `{"alg":"HS256","typ":"JWT"}`. No other algorithm
//! is accepted on verification.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::claims::LicenseClaims;
use crate::error::{LicenseError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Environment variable holding the signing secret.
pub const SIGNING_SECRET_ENV: &str = "JWT_SECRET";

/// The only supported signature algorithm.
pub const ALGORITHM: &str = "HS256";

/// Secret used to sign and verify licenses.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap a secret. Empty secrets are rejected.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(LicenseError::Configuration(format!(
                "{SIGNING_SECRET_ENV} missing"
            )));
        }
        Ok(Self(secret))
    }

    /// Load from `JWT_SECRET`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(SIGNING_SECRET_ENV) {
            Ok(raw) => Self::new(raw),
            Err(_) => Err(LicenseError::Configuration(format!(
                "{SIGNING_SECRET_ENV} missing"
            ))),
        }
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Signs and verifies license tokens.
#[derive(Debug, Clone)]
pub struct LicenseSigner {
    secret: SigningSecret,
}

impl LicenseSigner {
    /// Create a signer.
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret.0)
            .map_err(|_| LicenseError::Configuration("unusable signing secret".into()))
    }

    /// Sign claims into a compact token.
    pub fn sign(&self, claims: &LicenseClaims) -> Result<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| LicenseError::Malformed(format!("header encoding: {e}")))?;
        let claims_json = serde_json::to_vec(claims)
            .map_err(|e| LicenseError::Malformed(format!("claims encoding: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a token's signature and expiry at `now` (Unix seconds).
    ///
    /// The signature is checked before the claims are parsed.
    pub fn verify(&self, token: &str, now: i64) -> Result<LicenseClaims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(LicenseError::Malformed("expected three segments".into()));
        };

        let header: Header = decode_json(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(LicenseError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| LicenseError::Malformed("signature is not base64url".into()))?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        let mut mac = self.mac()?;
        mac.update(&token.as_bytes()[..signing_input_len]);
        if mac.verify_slice(&signature).is_err() {
            tracing::debug!("license signature mismatch");
            return Err(LicenseError::BadSignature);
        }

        let claims: LicenseClaims = decode_json(claims_b64, "claims")?;
        if claims.is_expired(now) {
            tracing::debug!(doc_id = %claims.doc_id, exp = claims.exp, now, "license expired");
            return Err(LicenseError::Expired { exp: claims.exp });
        }

        Ok(claims)
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| LicenseError::Malformed(format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes).map_err(|_| LicenseError::Malformed(format!("invalid {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ttl::LicenseTtl;
    use pagevault_core::{ContentKey, DocumentId, PageRange};

    const T: i64 = 1_700_000_000;

    fn signer(secret: &str) -> LicenseSigner {
        LicenseSigner::new(SigningSecret::new(secret).unwrap())
    }

    fn claims() -> LicenseClaims {
        LicenseClaims::new(
            DocumentId(1),
            &ContentKey::from_bytes([1u8; 32]),
            PageRange::whole(3).unwrap(),
            T,
            LicenseTtl::default(),
        )
    }

    #[test]
    fn test_sign_verify() {
        let signer = signer("secret");
        let token = signer.sign(&claims()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(signer.verify(&token, T).unwrap(), claims());
    }

    #[test]
    fn test_header_is_hs256_jwt() {
        let token = signer("secret").sign(&claims()).unwrap();
        let header = token.split('.').next().unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(header).unwrap();
        assert_eq!(decoded, br#"{"alg":"HS256","typ":"JWT"}"#);
    }

    #[test]
    fn test_expiry_window() {
        let signer = signer("secret");
        let token = signer.sign(&claims()).unwrap();
        assert!(signer.verify(&token, T + 59).is_ok());
        assert!(matches!(
            signer.verify(&token, T + 60),
            Err(LicenseError::Expired { exp }) if exp == T + 60
        ));
        assert!(matches!(
            signer.verify(&token, T + 61),
            Err(LicenseError::Expired { .. })
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = signer("secret").sign(&claims()).unwrap();
        assert!(matches!(
            signer("other").verify(&token, T),
            Err(LicenseError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer("secret");
        let token = signer.sign(&claims()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut forged = claims();
        forged.pages = PageRange::whole(100).unwrap();
        let forged_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{}.{}.{}", parts[0], forged_b64, parts[2]);

        assert!(matches!(
            signer.verify(&forged_token, T),
            Err(LicenseError::BadSignature)
        ));
    }

    #[test]
    fn test_alg_none_rejected() {
        let signer = signer("secret");
        let token = signer.sign(&claims()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{}.{}.", none_header, parts[1]);

        assert!(matches!(
            signer.verify(&forged, T),
            Err(LicenseError::UnsupportedAlgorithm(alg)) if alg == "none"
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer("secret");
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(signer.verify(token, T), Err(LicenseError::Malformed(_))),
                "{token:?}"
            );
        }
    }

    proptest::proptest! {
        #[test]
        fn test_any_altered_character_rejected(index in 0usize..10_000, replacement in "[A-Za-z0-9_-]") {
            let signer = signer("secret");
            let token = signer.sign(&claims()).unwrap();
            let index = index % token.len();
            proptest::prop_assume!(token.as_bytes()[index] != b'.');
            proptest::prop_assume!(token[index..index + 1] != replacement);

            let mut altered = token.clone();
            altered.replace_range(index..index + 1, &replacement);
            proptest::prop_assert!(signer.verify(&altered, T).is_err());
        }
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            SigningSecret::new(""),
            Err(LicenseError::Configuration(_))
        ));
    }
}
