//! Fulfillment status polling endpoint.
//!
//! Success pages poll this after checkout: processing happens in the
//! background, so the download link may not exist yet when the customer
//! lands back on the site.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for `GET /api/fulfillment/status`.
#[derive(Debug, Deserialize)]
pub struct StatusParams {
    #[serde(default)]
    pub txn: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the transaction has been processed
    pub ready: bool,

    /// Download URL, once processed and only when a deliverable exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Handle `GET /api/fulfillment/status?txn=...`.
///
/// Returns `{"ready":false}` until the background pass has recorded the
/// transaction. `download_url` is omitted for purchases that resolved to no
/// deliverable.
pub async fn fulfillment_status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<StatusResponse>, AppError> {
    let txn = params
        .txn
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidPayload("Missing txn".to_string()))?;

    let Some(record) = state.store.get_fulfillment(txn).await? else {
        return Ok(Json(StatusResponse {
            ready: false,
            download_url: None,
        }));
    };

    Ok(Json(StatusResponse {
        ready: true,
        download_url: record
            .download_token
            .as_deref()
            .map(|token| state.fulfillment.download_url(token)),
    }))
}
