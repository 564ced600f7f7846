//! Shared-secret signature verification for push notifications.
//!
//! The sender signs the exact request body with HMAC-SHA256 and sends
//! `sha256=<hex digest>` in the `X-Hub-Signature-256` header.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Why a request failed authentication
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature")]
    MissingSignature,

    #[error("invalid signature")]
    InvalidSignature,
}

/// Look up the signature header.
///
/// `HeaderMap` keys are case-insensitive, so `X-Hub-Signature-256` and
/// `x-hub-signature-256` resolve to the same entry. A value that is not
/// visible ASCII is treated as present but unusable.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .map(|value| value.to_str().unwrap_or_default())
}

/// Compute the header value a sender holding `secret` would attach to `body`
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify `claimed` against the HMAC of the raw, unparsed `body`.
///
/// The digest comparison runs in constant time; a claimed value without the
/// `sha256=` prefix or with a non-hex digest is rejected as invalid.
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    claimed: Option<&str>,
) -> Result<(), SignatureError> {
    let claimed = claimed.ok_or(SignatureError::MissingSignature)?;

    let digest = claimed
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::InvalidSignature)?;
    let digest = hex::decode(digest).map_err(|_| SignatureError::InvalidSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&digest).map_err(|_| SignatureError::InvalidSignature)
}
