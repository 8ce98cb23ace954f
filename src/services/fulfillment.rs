//! Webhook processing pipeline: idempotency gate, key resolution, token
//! issuance, persistence, and best-effort fan-out notifications.
//!
//! The pipeline runs as a background task after the provider has already
//! received its acknowledgment. Providers deliver at-least-once; the
//! fulfillment record is the sole mechanism turning that into exactly-once
//! side effects, so it is checked before anything else and written before
//! any notification fires.

use std::sync::Arc;

use chrono::{Duration, Utc};
use url::Url;
use uuid::Uuid;

use crate::email::{self, Mailer};
use crate::models::fulfillment::{DownloadTokenRecord, FulfillmentRecord};
use crate::models::order::OrderRecord;
use crate::models::webhook::TransactionPayload;
use crate::orders::OrderStore;
use crate::resolver::KeyResolver;
use crate::store::{StoreError, TokenStore};

/// How long a download link stays valid. Fixed policy, not configurable.
pub const DOWNLOAD_EXPIRY_DAYS: i64 = 30;

/// Result of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Token issued and recorded; notifications attempted.
    Fulfilled { download_token: String },

    /// Transaction recorded for order tracking, but no deliverable key could
    /// be resolved, so no token exists and no download email was sent.
    RecordedNoDeliverable,

    /// A fulfillment record already existed (redelivery, or a concurrent
    /// pass won the insert). Nothing was written or sent.
    AlreadyProcessed,
}

/// Orchestrates fulfillment of completed transactions.
pub struct FulfillmentService {
    store: Arc<dyn TokenStore>,
    orders: Arc<dyn OrderStore>,
    /// `None` disables email entirely (logged only)
    mailer: Option<Arc<dyn Mailer>>,
    resolver: KeyResolver,
    public_base_url: Url,
}

impl FulfillmentService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        orders: Arc<dyn OrderStore>,
        mailer: Option<Arc<dyn Mailer>>,
        resolver: KeyResolver,
        public_base_url: Url,
    ) -> Self {
        Self {
            store,
            orders,
            mailer,
            resolver,
            public_base_url,
        }
    }

    /// Process one `transaction.completed` delivery.
    ///
    /// # Pipeline
    ///
    /// 1. Idempotency gate: bail out if the transaction was already processed
    /// 2. Resolve the deliverable storage key (absence is not an error)
    /// 3. Mint a download token and compute its expiry
    /// 4. Persist fulfillment + token as one unit of work
    /// 5. Record the order and email the customer, best-effort
    ///
    /// # Errors
    ///
    /// Only store failures propagate. Notification failures are logged and
    /// swallowed; the provider never sees them.
    pub async fn process(
        &self,
        transaction_id: &str,
        transaction: &TransactionPayload,
    ) -> Result<ProcessOutcome, StoreError> {
        // Step 1: the gate must run before any token is minted
        if self.store.get_fulfillment(transaction_id).await?.is_some() {
            tracing::info!(transaction_id, "Already processed, skipping");
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        // Step 2: resolve the deliverable
        let resource_key = self.resolver.resolve(transaction);
        if resource_key.is_none() {
            tracing::warn!(
                transaction_id,
                "No deliverable key resolved, recording transaction without a token"
            );
        }

        // Step 3: mint only when there is something to deliver
        let now = Utc::now();
        let issued = resource_key.map(|key| {
            let token_record = DownloadTokenRecord {
                resource_key: key,
                product_id: first_catalog_id(transaction),
                expires_at: now + Duration::days(DOWNLOAD_EXPIRY_DAYS),
            };
            (generate_token(), token_record)
        });

        let fulfillment = FulfillmentRecord {
            download_token: issued.as_ref().map(|(token, _)| token.clone()),
            created_at: now,
        };

        // Step 4: one unit of work; a lost race means another pass owns the
        // transaction and this one must stay silent
        let inserted = self
            .store
            .put_fulfillment(
                transaction_id,
                &fulfillment,
                issued
                    .as_ref()
                    .map(|(token, record)| (token.as_str(), record)),
            )
            .await?;
        if !inserted {
            tracing::info!(transaction_id, "Lost insert race, skipping notifications");
            return Ok(ProcessOutcome::AlreadyProcessed);
        }

        // Step 5: fan-out, never fatal
        let download_token = issued.map(|(token, _)| token);
        self.record_order(transaction_id, transaction, download_token.as_deref())
            .await;
        self.send_emails(transaction_id, transaction, download_token.as_deref())
            .await;

        Ok(match download_token {
            Some(download_token) => {
                tracing::info!(transaction_id, "Fulfilled");
                ProcessOutcome::Fulfilled { download_token }
            }
            None => ProcessOutcome::RecordedNoDeliverable,
        })
    }

    /// Write the order row. Failure is logged, not propagated.
    async fn record_order(
        &self,
        transaction_id: &str,
        transaction: &TransactionPayload,
        download_token: Option<&str>,
    ) {
        let totals = transaction
            .details
            .as_ref()
            .and_then(|d| d.totals.as_ref());
        let order = OrderRecord {
            id: Uuid::new_v4(),
            transaction_id: transaction_id.to_string(),
            customer_email: transaction.customer_email().map(String::from),
            currency: transaction.currency_code.clone(),
            total: totals.and_then(|t| t.grand_total.clone().or_else(|| t.total.clone())),
            items: serde_json::to_value(&transaction.items).unwrap_or_default(),
            download_token: download_token.map(String::from),
            created_at: Utc::now(),
        };

        if let Err(e) = self.orders.insert(&order).await {
            tracing::error!(transaction_id, "Order insert failed: {}", e);
        }
    }

    /// Send the download link and order confirmation emails.
    ///
    /// Skipped entirely when the checkout carried no customer email, when
    /// email is disabled, or when no token was issued (there is no link to
    /// send). Failures are logged, not propagated.
    async fn send_emails(
        &self,
        transaction_id: &str,
        transaction: &TransactionPayload,
        download_token: Option<&str>,
    ) {
        let Some(mailer) = self.mailer.as_deref() else {
            tracing::info!(transaction_id, "Email disabled, skipping");
            return;
        };
        let Some(to) = transaction.customer_email() else {
            tracing::info!(transaction_id, "No customer email, skipping emails");
            return;
        };
        let Some(token) = download_token else {
            return;
        };

        let download_url = self.download_url(token);

        let (subject, html) = email::download_ready_email(&download_url, DOWNLOAD_EXPIRY_DAYS);
        if let Err(e) = email::send_with_retry(mailer, to, &subject, &html).await {
            tracing::error!(transaction_id, "Download email failed: {}", e);
        }

        let (subject, html) = email::order_confirmation_email(transaction_id);
        if let Err(e) = mailer.send(to, &subject, &html).await {
            tracing::warn!(transaction_id, "Order confirmation email failed: {}", e);
        }
    }

    /// Absolute download URL for a token.
    pub fn download_url(&self, token: &str) -> String {
        let mut url = self.public_base_url.clone();
        url.set_path("/download");
        url.set_query(Some(&format!("token={token}")));
        url.to_string()
    }
}

/// Mint a download token: 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Price id of the first line item carrying one, falling back to product id.
fn first_catalog_id(transaction: &TransactionPayload) -> Option<String> {
    let item = transaction.items.first()?;
    item.price
        .as_ref()
        .and_then(|p| p.id.clone())
        .or_else(|| item.product.as_ref().and_then(|p| p.id.clone()))
}
