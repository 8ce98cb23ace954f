//! Durable token store: fulfillment records and download tokens.
//!
//! The store provides two lookups (by transaction id and by token) and one
//! write. The write covers both records as a single unit of work so a
//! partially-written pair can never be observed, and it detects conflicting
//! concurrent writes so exactly one processing pass per transaction id ever
//! proceeds to notifications.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::models::fulfillment::{DownloadTokenRecord, FulfillmentRecord};

/// Errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable key-value map backing fulfillment state.
///
/// Lookups on a missing key return `Ok(None)`, never an error. Implementors
/// must provide read-your-writes consistency per key.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch the fulfillment record for a transaction id.
    async fn get_fulfillment(
        &self,
        transaction_id: &str,
    ) -> Result<Option<FulfillmentRecord>, StoreError>;

    /// Fetch the access record for a download token.
    async fn get_token(&self, token: &str) -> Result<Option<DownloadTokenRecord>, StoreError>;

    /// Write the fulfillment record and, when a deliverable was resolved,
    /// its token record, as one unit of work.
    ///
    /// Returns `false` without writing anything when a fulfillment for this
    /// transaction id already exists; whichever concurrent caller loses the
    /// insert race observes `false`.
    async fn put_fulfillment(
        &self,
        transaction_id: &str,
        fulfillment: &FulfillmentRecord,
        token: Option<(&str, &DownloadTokenRecord)>,
    ) -> Result<bool, StoreError>;
}

/// PostgreSQL-backed token store.
///
/// # Tables
///
/// - `fulfillments`: transaction id → token + issuance time
/// - `download_tokens`: token → resource key + expiry
///
/// Both inserts run inside one database transaction; the fulfillment insert
/// uses `ON CONFLICT DO NOTHING` so a redelivered or racing write is
/// detected by `rows_affected() == 0` rather than failing.
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: DbPool,
}

impl PgTokenStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn get_fulfillment(
        &self,
        transaction_id: &str,
    ) -> Result<Option<FulfillmentRecord>, StoreError> {
        let record = sqlx::query_as::<_, FulfillmentRecord>(
            "SELECT download_token, created_at FROM fulfillments WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_token(&self, token: &str) -> Result<Option<DownloadTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, DownloadTokenRecord>(
            "SELECT resource_key, product_id, expires_at FROM download_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn put_fulfillment(
        &self,
        transaction_id: &str,
        fulfillment: &FulfillmentRecord,
        token: Option<(&str, &DownloadTokenRecord)>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The fulfillment row is the idempotency marker; a conflict means
        // this transaction was already processed (or another pass won the
        // race) and nothing may be written.
        let inserted = sqlx::query(
            r#"
            INSERT INTO fulfillments (transaction_id, download_token, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(transaction_id)
        .bind(&fulfillment.download_token)
        .bind(fulfillment.created_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some((token_value, record)) = token {
            sqlx::query(
                r#"
                INSERT INTO download_tokens (token, resource_key, product_id, expires_at, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(token_value)
            .bind(&record.resource_key)
            .bind(&record.product_id)
            .bind(record.expires_at)
            .bind(fulfillment.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(true)
    }
}
