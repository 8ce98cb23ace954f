//! Test utilities and fixtures for fulfillment relay integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub use fulfillment_relay::app;
pub use fulfillment_relay::blob::{BlobError, BlobStore, StoredObject};
pub use fulfillment_relay::email::{MailError, Mailer};
pub use fulfillment_relay::models::fulfillment::{DownloadTokenRecord, FulfillmentRecord};
pub use fulfillment_relay::models::order::OrderRecord;
pub use fulfillment_relay::models::webhook::TransactionPayload;
pub use fulfillment_relay::orders::OrderStore;
pub use fulfillment_relay::resolver::KeyResolver;
pub use fulfillment_relay::services::download::DownloadService;
pub use fulfillment_relay::services::fulfillment::FulfillmentService;
pub use fulfillment_relay::state::AppState;
pub use fulfillment_relay::store::{StoreError, TokenStore};

pub const TEST_SECRET: &str = "whsec_test_secret";
pub const TEST_BASE_URL: &str = "https://downloads.example.com";

/// In-memory token store.
///
/// Holds both maps behind one lock so the pair write is atomic, mirroring
/// the production store's unit-of-work semantics.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<MemoryTokenStoreInner>,
}

#[derive(Default)]
struct MemoryTokenStoreInner {
    fulfillments: HashMap<String, FulfillmentRecord>,
    tokens: HashMap<String, DownloadTokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert records directly, bypassing the processing pipeline.
    pub fn seed(
        &self,
        transaction_id: &str,
        fulfillment: FulfillmentRecord,
        token: Option<(&str, DownloadTokenRecord)>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .fulfillments
            .insert(transaction_id.to_string(), fulfillment);
        if let Some((token_value, record)) = token {
            inner.tokens.insert(token_value.to_string(), record);
        }
    }

    pub fn fulfillment(&self, transaction_id: &str) -> Option<FulfillmentRecord> {
        self.inner
            .lock()
            .unwrap()
            .fulfillments
            .get(transaction_id)
            .cloned()
    }

    pub fn token(&self, token: &str) -> Option<DownloadTokenRecord> {
        self.inner.lock().unwrap().tokens.get(token).cloned()
    }

    pub fn token_count(&self) -> usize {
        self.inner.lock().unwrap().tokens.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_fulfillment(
        &self,
        transaction_id: &str,
    ) -> Result<Option<FulfillmentRecord>, StoreError> {
        Ok(self.fulfillment(transaction_id))
    }

    async fn get_token(&self, token: &str) -> Result<Option<DownloadTokenRecord>, StoreError> {
        Ok(self.token(token))
    }

    async fn put_fulfillment(
        &self,
        transaction_id: &str,
        fulfillment: &FulfillmentRecord,
        token: Option<(&str, &DownloadTokenRecord)>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fulfillments.contains_key(transaction_id) {
            return Ok(false);
        }
        inner
            .fulfillments
            .insert(transaction_id.to_string(), fulfillment.clone());
        if let Some((token_value, record)) = token {
            inner.tokens.insert(token_value.to_string(), record.clone());
        }
        Ok(true)
    }
}

/// In-memory blob store seeded with fixed objects.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, key: &str, content_type: Option<&str>, data: &[u8]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.map(String::from),
                data: Bytes::copy_from_slice(data),
            },
        );
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }
}

/// Order store double that records every insert.
#[derive(Default)]
pub struct RecordingOrderStore {
    pub orders: Mutex<Vec<OrderRecord>>,
}

impl RecordingOrderStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for RecordingOrderStore {
    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }
}

/// A sent email captured by the recording mailer.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer double that records sends, optionally failing the first N.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` sends before succeeding.
    pub fn failing(n: u32) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: Mutex::new(n),
        })
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let mut failures = self.failures_remaining.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(MailError::Api {
                status: 500,
                body: "simulated failure".to_string(),
            });
        }
        drop(failures);

        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Handles to every double wired into a test fixture.
pub struct TestFixture {
    pub store: Arc<MemoryTokenStore>,
    pub blob: Arc<MemoryBlobStore>,
    pub orders: Arc<RecordingOrderStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: AppState,
}

/// Build an `AppState` wired entirely to in-memory doubles.
pub fn test_fixture() -> TestFixture {
    test_fixture_with(KeyResolver::default(), RecordingMailer::new())
}

pub fn test_fixture_with(resolver: KeyResolver, mailer: Arc<RecordingMailer>) -> TestFixture {
    let store = MemoryTokenStore::new();
    let blob = MemoryBlobStore::new();
    let orders = RecordingOrderStore::new();

    let fulfillment = FulfillmentService::new(
        store.clone(),
        orders.clone(),
        Some(mailer.clone()),
        resolver,
        Url::parse(TEST_BASE_URL).expect("test base URL is valid"),
    );
    let download = DownloadService::new(store.clone(), blob.clone());

    let state = AppState {
        webhook_secret: TEST_SECRET.into(),
        fulfillment: Arc::new(fulfillment),
        download: Arc::new(download),
        store: store.clone(),
        pool: None,
    };

    TestFixture {
        store,
        blob,
        orders,
        mailer,
        state,
    }
}

/// Compute a valid signature header for a raw body.
pub fn sign_body(body: &[u8], secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("ts={};h1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// A `transaction.completed` webhook body with a transaction-level
/// delivery path and a customer email.
pub fn completed_webhook_body(transaction_id: &str, download_path: &str) -> String {
    serde_json::json!({
        "event_type": "transaction.completed",
        "event_id": "evt_0001",
        "data": {
            "id": transaction_id,
            "status": "completed",
            "currency_code": "USD",
            "items": [
                {
                    "price": { "id": "pri_0001", "name": "Demo" },
                    "product": { "id": "pro_0001", "name": "Demo product" }
                }
            ],
            "details": { "totals": { "total": "19.00", "grand_total": "19.00" } },
            "checkout": { "customer": { "email": "buyer@example.com" } },
            "custom_data": { "download_path": download_path }
        }
    })
    .to_string()
}

/// Deserialize a JSON string into a `TransactionPayload` for service-level
/// tests.
pub fn payload_from_json(json: serde_json::Value) -> TransactionPayload {
    serde_json::from_value(json).expect("test payload deserializes")
}
