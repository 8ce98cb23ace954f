//! Download Fulfillment Relay - Main Application Entry Point
//!
//! HTTP service sitting between a payment provider, blob storage, a
//! database, and an email API. Completed payments arrive as signed webhooks;
//! the service issues a 30-day download link per transaction, records the
//! order, and emails the customer. Download links are served back out of
//! blob storage until they expire.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (fulfillments, download tokens, orders)
//! - **Blob Storage**: filesystem-backed store of deliverable files
//! - **Email**: Resend API via reqwest, best-effort
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Wire stores, resolver, mailer, and services
//! 4. Build HTTP router and start serving

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use url::Url;

use fulfillment_relay::blob::FsBlobStore;
use fulfillment_relay::config::Config;
use fulfillment_relay::email::{Mailer, ResendMailer};
use fulfillment_relay::orders::PgOrderStore;
use fulfillment_relay::resolver::KeyResolver;
use fulfillment_relay::services::download::DownloadService;
use fulfillment_relay::services::fulfillment::FulfillmentService;
use fulfillment_relay::state::AppState;
use fulfillment_relay::store::{PgTokenStore, TokenStore};
use fulfillment_relay::{app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let public_base_url = Url::parse(&config.public_base_url)?;
    let product_key_table = config.product_key_table()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Wire collaborators behind their seams
    let store: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(pool.clone()));
    let orders = Arc::new(PgOrderStore::new(pool.clone()));
    let blob = Arc::new(FsBlobStore::new(&config.assets_dir));
    let mailer: Option<Arc<dyn Mailer>> = match &config.resend_api_key {
        Some(api_key) => Some(Arc::new(ResendMailer::new(
            api_key.clone(),
            config.email_from.clone(),
        ))),
        None => {
            tracing::warn!("RESEND_API_KEY not set, customer emails disabled");
            None
        }
    };

    let fulfillment = FulfillmentService::new(
        store.clone(),
        orders,
        mailer,
        KeyResolver::new(product_key_table),
        public_base_url,
    );
    let download = DownloadService::new(store.clone(), blob);

    let state = AppState {
        webhook_secret: config.webhook_secret.clone().into(),
        fulfillment: Arc::new(fulfillment),
        download: Arc::new(download),
        store,
        pool: Some(pool),
    };

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app(state)).await?;

    Ok(())
}
