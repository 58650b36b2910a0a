//! Health check endpoint

use axum::{routing::get, Json, Router};
use cry_common::time::{now, to_iso8601};

use crate::models::HealthResponse;
use crate::AppState;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: to_iso8601(&now()),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
