//! HMAC-SHA256 payload signatures

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn keyed(secret: &str) -> Option<HmacSha256> {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(secret.as_bytes()).ok()
}

/// Hex-encoded HMAC-SHA256 of `body` keyed by `secret`
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    match keyed(secret) {
        Some(mut mac) => {
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        }
        None => String::new(),
    }
}

/// Check a received hex signature against `body`
///
/// Comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Some(mut mac) = keyed(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}
