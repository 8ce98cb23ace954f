//! Token-gated download handler.

use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::services::download::DownloadError;
use crate::state::AppState;

/// Query parameters for `GET /download`.
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub token: Option<String>,

    /// `debug=1` switches refusals from plain text to structured JSON
    #[serde(default)]
    pub debug: Option<String>,
}

/// Handle `GET /download?token=...`.
///
/// # Response Codes
///
/// - `200` streams the file as an attachment with `Cache-Control: no-store`
/// - `400` missing token
/// - `404` unknown token, or valid token whose backing object is gone
/// - `410` expired token
///
/// Each refusal keeps its own status so callers can tell "check your email"
/// apart from "link expired, contact support".
pub async fn serve_download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Response {
    let debug = params.debug.as_deref() == Some("1");

    match state.download.serve(params.token.as_deref()).await {
        Ok(download) => {
            // Fall back to a generic binary type when the object carries no
            // content type or a text-like one that would render inline
            let content_type = match download.object.content_type.as_deref() {
                Some(ct) if !ct.starts_with("text/") => ct.to_string(),
                _ => "application/octet-stream".to_string(),
            };

            tracing::info!(filename = %download.filename, "Serving file");

            (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", download.filename),
                    ),
                    (header::CACHE_CONTROL, "no-store".to_string()),
                    (header::CONTENT_TYPE, content_type),
                ],
                Body::from(download.object.data),
            )
                .into_response()
        }
        Err(e) => refusal_response(e, debug),
    }
}

/// Map a refusal to its status, as plain text or JSON per the debug flag.
fn refusal_response(error: DownloadError, debug: bool) -> Response {
    let status = match &error {
        DownloadError::MissingToken => StatusCode::BAD_REQUEST,
        DownloadError::NotFound => StatusCode::NOT_FOUND,
        DownloadError::Expired => StatusCode::GONE,
        DownloadError::Store(_) | DownloadError::Blob(_) => {
            tracing::error!("Download failed: {}", error);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
                .into_response();
        }
    };

    tracing::warn!(status = %status, "Download refused: {}", error);

    if debug {
        (status, Json(json!({ "error": error.to_string() }))).into_response()
    } else {
        (status, error.to_string()).into_response()
    }
}
