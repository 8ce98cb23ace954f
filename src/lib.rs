//! Webhook-driven download fulfillment service.
//!
//! Receives payment-completion webhooks, verifies their signatures,
//! idempotently issues time-limited download tokens, records purchases, and
//! emails customers their download links. Presented tokens are served by
//! streaming the purchased file out of blob storage.

pub mod blob;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod handlers;
pub mod models;
pub mod orders;
pub mod resolver;
pub mod services;
pub mod signature;
pub mod state;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
///
/// Shared between `main` and the integration tests so both exercise the
/// exact same routing and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/webhook/payment",
            post(handlers::webhook::receive_webhook),
        )
        .route(
            "/api/fulfillment/status",
            get(handlers::status::fulfillment_status),
        )
        .route("/download", get(handlers::download::serve_download))
        // Add tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
