//! Order rows recorded per completed transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A purchase record written after fulfillment.
///
/// # Database Table
///
/// Maps to the `orders` table. The insert is best-effort: a failure is
/// logged and does not affect the fulfillment itself.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrderRecord {
    pub id: Uuid,

    /// Provider-assigned transaction identifier
    pub transaction_id: String,

    /// Customer email, when the checkout carried one
    pub customer_email: Option<String>,

    /// ISO 4217 currency code
    pub currency: Option<String>,

    /// Grand total as reported by the provider (string-typed on the wire)
    pub total: Option<String>,

    /// Purchased line items, stored verbatim as JSON
    pub items: serde_json::Value,

    /// Download token minted for this purchase, if any
    pub download_token: Option<String>,

    pub created_at: DateTime<Utc>,
}
