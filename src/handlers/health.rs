//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Health check response.
///
/// Returns service status and database connectivity.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Database connection status
    pub database: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// Verifies database connectivity with a trivial query when a pool is
/// configured. Returns the standard error response if the database is
/// unreachable.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let database = match &state.pool {
        Some(pool) => {
            sqlx::query("SELECT 1").execute(pool).await?;
            "connected"
        }
        None => "not_configured",
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
        timestamp: Utc::now(),
    }))
}
