//! Shared application state injected into handlers.

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::download::DownloadService;
use crate::services::fulfillment::FulfillmentService;
use crate::store::TokenStore;

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Shared secret for verifying inbound webhook signatures
    pub webhook_secret: Arc<str>,

    pub fulfillment: Arc<FulfillmentService>,

    pub download: Arc<DownloadService>,

    /// Direct store access for the status endpoint
    pub store: Arc<dyn TokenStore>,

    /// Pool handle for the health check; `None` when running against
    /// non-database backends (e.g. in tests)
    pub pool: Option<DbPool>,
}
