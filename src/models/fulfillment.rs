//! Fulfillment and download token records.
//!
//! Both records are created together in a single processing pass and are
//! read-only afterwards. The fulfillment record doubles as the idempotency
//! marker: its presence means the transaction has been processed and any
//! redelivery must be a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Record keyed by the provider's transaction identifier.
///
/// # Database Table
///
/// Maps to the `fulfillments` table. At most one row per transaction id ever
/// exists; the row is never mutated or deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FulfillmentRecord {
    /// Token minted for this transaction.
    ///
    /// NULL when no deliverable key could be resolved: the purchase is still
    /// recorded for order tracking, but no download link exists.
    pub download_token: Option<String>,

    /// When the fulfillment was processed
    pub created_at: DateTime<Utc>,
}

/// Record keyed by the opaque download token.
///
/// # Database Table
///
/// Maps to the `download_tokens` table.
///
/// # Validity
///
/// A token grants access if and only if its record exists and the current
/// time is strictly before `expires_at`. Tokens are not revocable early.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DownloadTokenRecord {
    /// Storage key of the deliverable object
    pub resource_key: String,

    /// Price or product id the purchase resolved through, for observability
    pub product_id: Option<String>,

    /// Absolute expiry timestamp (strict less-than check)
    pub expires_at: DateTime<Utc>,
}

impl DownloadTokenRecord {
    /// Whether the token is still valid at `now`.
    ///
    /// Expiry is exclusive: a token is invalid at exactly `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
