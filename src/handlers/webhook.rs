//! Inbound payment webhook handler.
//!
//! The provider enforces a response deadline and retries deliveries it
//! considers failed, so the handler acknowledges as soon as the request is
//! signature-valid and structurally acceptable, then processes in the
//! background. Redeliveries are absorbed by the idempotency gate inside the
//! processing pipeline, never rejected here.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;

use crate::error::AppError;
use crate::models::webhook::{PaymentWebhook, TRANSACTION_COMPLETED};
use crate::signature::{self, SIGNATURE_HEADER};
use crate::state::AppState;

/// Acknowledgment body returned to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Handle `POST /api/webhook/payment`.
///
/// # Response Codes
///
/// - `401` missing, malformed, stale, or mismatched signature
/// - `400` unparseable JSON, or a `transaction.completed` event with no
///   transaction id
/// - `200` everything else, including event types this service ignores
///
/// Processing failures after acknowledgment are never surfaced to the
/// provider; a retry caused by a downstream outage would only hit the
/// idempotency gate.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // Signature check runs on the raw bytes, before any parsing
    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if !signature::verify(&body, signature_header, state.webhook_secret.as_bytes()) {
        tracing::warn!("Webhook rejected: invalid signature");
        return Err(AppError::InvalidSignature);
    }

    let event: PaymentWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidPayload(format!("Invalid JSON: {e}")))?;

    if event.event_type != TRANSACTION_COMPLETED {
        tracing::info!(event_type = %event.event_type, "Ignoring event");
        return Ok((StatusCode::OK, Json(WebhookAck { received: true })));
    }

    let Some(transaction_id) = event.data.transaction_id().map(String::from) else {
        tracing::warn!("transaction.completed event missing transaction id");
        return Err(AppError::InvalidPayload(
            "Missing transaction id".to_string(),
        ));
    };

    tracing::info!(%transaction_id, "Accepted, processing in background");

    // Acknowledge now; the pipeline runs on its own task
    let fulfillment = state.fulfillment.clone();
    tokio::spawn(async move {
        if let Err(e) = fulfillment.process(&transaction_id, &event.data).await {
            tracing::error!(%transaction_id, "Fulfillment failed: {}", e);
        }
    });

    Ok((StatusCode::OK, Json(WebhookAck { received: true })))
}
