//! HMAC-SHA256 request signatures.
//!
//! The signature is the lowercase hex digest of HMAC-SHA256 over the
//! canonical string, keyed by the application secret.

use {
    hmac::{Hmac, Mac},
    secrecy::{ExposeSecret, SecretString},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

use crate::canonical::{QueryParams, canonical_string};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid secret key")]
    InvalidSecret,
}

/// Hex-encoded HMAC-SHA256 of `to_sign`.
pub fn sign(secret: &SecretString, to_sign: &str) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(to_sign.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `supplied_hex` against the signature of `to_sign`.
///
/// The comparison runs in constant time and only reports match or mismatch.
pub fn verify(secret: &SecretString, to_sign: &str, supplied_hex: &str) -> bool {
    match sign(secret, to_sign) {
        Ok(expected) => expected.as_bytes().ct_eq(supplied_hex.as_bytes()).into(),
        Err(_) => false,
    }
}

/// Client side: canonicalize a request and sign it.
///
/// `params` must not contain `auth_signature`.
pub fn sign_request(
    secret: &SecretString,
    method: &str,
    path: &str,
    params: &QueryParams,
) -> Result<String, SignatureError> {
    sign(secret, &canonical_string(method, path, params))
}
