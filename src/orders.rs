//! Order persistence.
//!
//! Orders exist for bookkeeping and support lookups; writing one is
//! best-effort and never gates fulfillment.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::models::order::OrderRecord;
use crate::store::StoreError;

/// Sink for purchase records.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError>;
}

/// PostgreSQL-backed order store.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id,
                transaction_id,
                customer_email,
                currency,
                total,
                items,
                download_token,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(&order.transaction_id)
        .bind(&order.customer_email)
        .bind(&order.currency)
        .bind(&order.total)
        .bind(&order.items)
        .bind(&order.download_token)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
