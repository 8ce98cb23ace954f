//! Inbound payment webhook payload types.
//!
//! The provider delivers events as JSON with an envelope (`event_type` plus
//! a `data` object). Only `transaction.completed` triggers fulfillment; every
//! other event type is acknowledged and ignored.
//!
//! All nested fields are optional on the wire: payloads vary by provider
//! configuration, and a missing field must degrade gracefully rather than
//! fail deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type that triggers fulfillment processing.
pub const TRANSACTION_COMPLETED: &str = "transaction.completed";

/// Envelope for a payment webhook delivery.
#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub event_type: String,

    #[serde(default)]
    pub event_id: Option<String>,

    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,

    pub data: TransactionPayload,
}

/// The transaction object carried by a `transaction.completed` event.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionPayload {
    /// Provider-assigned transaction identifier
    #[serde(default)]
    pub id: Option<String>,

    /// Legacy field some provider versions use instead of `id`
    #[serde(default)]
    pub transaction_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub currency_code: Option<String>,

    /// Purchased line items
    #[serde(default)]
    pub items: Vec<LineItem>,

    #[serde(default)]
    pub details: Option<TransactionDetails>,

    #[serde(default)]
    pub checkout: Option<Checkout>,

    /// Transaction-scoped delivery metadata
    #[serde(default)]
    pub custom_data: Option<DeliveryMetadata>,
}

impl TransactionPayload {
    /// The transaction identifier, preferring `id` over the legacy
    /// `transaction_id` field.
    pub fn transaction_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.transaction_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Customer email nested under the checkout object, if present and
    /// non-empty.
    pub fn customer_email(&self) -> Option<&str> {
        self.checkout
            .as_ref()?
            .customer
            .as_ref()?
            .email
            .as_deref()
            .filter(|email| !email.is_empty())
    }
}

/// One purchased line item, carrying optional price and product references.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<CatalogRef>,

    #[serde(default)]
    pub product: Option<CatalogRef>,
}

/// Reference to a catalog entity (price or product).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogRef {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// Item-scoped delivery metadata
    #[serde(default)]
    pub custom_data: Option<DeliveryMetadata>,
}

/// Delivery metadata attached at product, price, or transaction scope.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeliveryMetadata {
    /// Storage path of the deliverable file
    #[serde(default)]
    pub download_path: Option<String>,

    #[serde(default)]
    pub sku: Option<String>,

    #[serde(default)]
    pub product_name: Option<String>,
}

/// Monetary totals, used only for the order record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionDetails {
    #[serde(default)]
    pub totals: Option<Totals>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Totals {
    #[serde(default)]
    pub total: Option<String>,

    #[serde(default)]
    pub grand_total: Option<String>,
}

/// Checkout object nesting the customer contact details.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Checkout {
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Customer {
    #[serde(default)]
    pub email: Option<String>,
}
