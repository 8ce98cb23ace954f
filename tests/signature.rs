//! Webhook signature verification tests

mod common;

use common::{TEST_SECRET, sign_body};
use fulfillment_relay::signature::{SIGNATURE_TOLERANCE_SECS, verify, verify_at};

const BODY: &[u8] = br#"{"event_type":"transaction.completed"}"#;

/// Get current Unix timestamp (for webhook signature tests)
fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[test]
fn valid_signature_is_accepted() {
    let header = sign_body(BODY, TEST_SECRET, now());

    assert!(
        verify(BODY, Some(&header), TEST_SECRET.as_bytes()),
        "Valid signature should be accepted"
    );
}

#[test]
fn wrong_secret_is_rejected() {
    let header = sign_body(BODY, "wrong_secret", now());

    assert!(
        !verify(BODY, Some(&header), TEST_SECRET.as_bytes()),
        "Signature from wrong secret should be rejected"
    );
}

#[test]
fn tampered_body_is_rejected() {
    let header = sign_body(BODY, TEST_SECRET, now());
    let tampered = br#"{"event_type":"transaction.completed","hacked":true}"#;

    assert!(
        !verify(tampered, Some(&header), TEST_SECRET.as_bytes()),
        "Modified payload should be rejected"
    );
}

#[test]
fn missing_header_is_rejected() {
    assert!(!verify(BODY, None, TEST_SECRET.as_bytes()));
}

#[test]
fn malformed_header_is_rejected() {
    for header in [
        "",
        "garbage",
        "ts=;h1=",
        "h1=deadbeef",                // no timestamp
        "ts=1718000000",              // no digest
        "ts=not_a_number;h1=deadbeef", // non-numeric timestamp
    ] {
        assert!(
            !verify(BODY, Some(header), TEST_SECRET.as_bytes()),
            "Header {header:?} should be rejected"
        );
    }
}

#[test]
fn extra_header_fields_are_ignored() {
    let ts = now();
    let header = format!("{};v=1;extra=ignored", sign_body(BODY, TEST_SECRET, ts));

    assert!(verify(BODY, Some(&header), TEST_SECRET.as_bytes()));
}

#[test]
fn stale_timestamp_is_rejected() {
    // 10 minutes ago - beyond the 5-minute tolerance
    let header = sign_body(BODY, TEST_SECRET, now() - 600);

    assert!(
        !verify(BODY, Some(&header), TEST_SECRET.as_bytes()),
        "Old timestamp should be rejected even with a correct digest"
    );
}

#[test]
fn future_timestamp_is_rejected() {
    let header = sign_body(BODY, TEST_SECRET, now() + 600);

    assert!(
        !verify(BODY, Some(&header), TEST_SECRET.as_bytes()),
        "Implausibly-future timestamp should be rejected"
    );
}

#[test]
fn freshness_boundary_is_exact() {
    let now = 1_750_000_000;

    // Exactly at the tolerance window: accepted
    let at_limit = sign_body(BODY, TEST_SECRET, now - SIGNATURE_TOLERANCE_SECS);
    assert!(verify_at(BODY, Some(&at_limit), TEST_SECRET.as_bytes(), now));

    // One second past it, in either direction: rejected
    let too_old = sign_body(BODY, TEST_SECRET, now - SIGNATURE_TOLERANCE_SECS - 1);
    assert!(!verify_at(BODY, Some(&too_old), TEST_SECRET.as_bytes(), now));

    let too_new = sign_body(BODY, TEST_SECRET, now + SIGNATURE_TOLERANCE_SECS + 1);
    assert!(!verify_at(BODY, Some(&too_new), TEST_SECRET.as_bytes(), now));
}

#[test]
fn digest_length_mismatch_is_rejected() {
    let header = format!("ts={};h1=abc123", now());

    assert!(!verify(BODY, Some(&header), TEST_SECRET.as_bytes()));
}
