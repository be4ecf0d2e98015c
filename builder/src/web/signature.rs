//! GitHub webhook signature verification.
//!
//! GitHub signs webhook requests using HMAC-SHA1 over the raw request body.
//! The signature is sent in the `X-Hub-Signature` header as `sha1=<hex>`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Algorithm prefix carried by every signature header value.
pub const SIGNATURE_PREFIX: &str = "sha1=";

/// Extract the hex digest from a signature header value.
///
/// Returns `None` when the value is shorter than the prefix or does not start
/// with `sha1=`. Never panics.
pub fn parse_signature_header(header: &str) -> Option<&str> {
    header.strip_prefix(SIGNATURE_PREFIX)
}

/// Compute the lowercase hex HMAC-SHA1 digest of `body` keyed by `secret`.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Format a digest the way GitHub sends it (`sha1=<hex>`).
pub fn format_signature_header(digest: &str) -> String {
    format!("{}{}", SIGNATURE_PREFIX, digest)
}

/// Verify a GitHub webhook signature.
///
/// # Arguments
///
/// * `secret` - The webhook secret configured on the repository
/// * `body` - The raw request body, exactly as received
/// * `signature` - The `X-Hub-Signature` header value (`sha1=...`)
///
/// # Returns
///
/// `true` if the signature is well formed and matches, `false` otherwise.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Some(provided) = parse_signature_header(signature) else {
        return false;
    };

    let expected = compute_signature(secret, body);

    // Constant-time comparison to prevent timing attacks
    constant_time_compare(&expected, provided)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
