//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Authentication**: webhook signature failures, rejected at the boundary
/// - **Validation**: malformed payloads or missing required fields
/// - **Storage**: database failures (details hidden from clients)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Webhook signature is missing, malformed, stale, or does not match.
    ///
    /// Returns HTTP 401 Unauthorized. The request body is never processed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Request body could not be parsed or lacks a required field.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid payload")]
    InvalidPayload(String),

    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                self.to_string(),
            ),
            AppError::InvalidPayload(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_payload", msg.clone())
            }
            AppError::Database(_) | AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
