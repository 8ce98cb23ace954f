//! Payment webhook signature verification.
//!
//! The provider signs every delivery with an HMAC-SHA256 over
//! `ts + ":" + raw_body` and sends it in the `Payment-Signature` header as
//! semicolon-separated `key=value` pairs, e.g.
//!
//! ```text
//! Payment-Signature: ts=1718000000;h1=0a1b2c...
//! ```
//!
//! Verification must happen against the raw request bytes, before any JSON
//! parsing, and must reject deliveries whose timestamp is outside the replay
//! tolerance window in either direction.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Payment-Signature";

/// Replay tolerance window in seconds, applied in both directions.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook delivery against the shared secret, using the current
/// system clock for the freshness check.
///
/// Returns `false` for a missing or malformed header, a timestamp outside
/// the tolerance window, or a digest mismatch. Never errors.
pub fn verify(raw_body: &[u8], signature_header: Option<&str>, secret: &[u8]) -> bool {
    verify_at(
        raw_body,
        signature_header,
        secret,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify against an explicit clock.
///
/// Callers that need deterministic freshness checks pass `now_unix`
/// directly; [`verify`] is the wall-clock entry point.
pub fn verify_at(
    raw_body: &[u8],
    signature_header: Option<&str>,
    secret: &[u8],
    now_unix: i64,
) -> bool {
    let Some(header) = signature_header else {
        return false;
    };
    let Some((ts, h1)) = parse_signature_header(header) else {
        return false;
    };

    // Reject stale deliveries and implausibly-future timestamps alike
    let Ok(ts_num) = ts.parse::<i64>() else {
        return false;
    };
    if (now_unix - ts_num).abs() > SIGNATURE_TOLERANCE_SECS {
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(ts.as_bytes());
    mac.update(b":");
    mac.update(raw_body);
    let expected = hex::encode(mac.finalize().into_bytes());

    // Length check is not constant-time, but signature length is not secret
    // (always 64 hex chars for SHA-256)
    let expected_bytes = expected.as_bytes();
    let provided_bytes = h1.as_bytes();
    if expected_bytes.len() != provided_bytes.len() {
        return false;
    }

    // Constant-time comparison to prevent timing attacks
    expected_bytes.ct_eq(provided_bytes).into()
}

/// Parse the signature header into its `ts` and `h1` fields.
///
/// Fields are `;`-separated `key=value` pairs; unknown keys are ignored.
/// Returns `None` unless both required fields are present.
fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut h1 = None;

    for part in header.split(';') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) => match k.trim() {
                "ts" => ts = Some(v.trim()),
                "h1" if h1.is_none() => h1 = Some(v.trim()),
                _ => {}
            },
            _ => {}
        }
    }

    match (ts, h1) {
        (Some(ts), Some(h1)) if !ts.is_empty() && !h1.is_empty() => Some((ts, h1)),
        _ => None,
    }
}
