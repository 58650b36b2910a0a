//! Diagnostics endpoints

use axum::{extract::State, routing::get, Json, Router};

use crate::audio::TranscoderStatus;
use crate::AppState;

/// GET /diagnostics/transcoder
///
/// Reports whether the external transcoder is installed. The probe runs once
/// per process; later calls return the cached answer.
pub async fn transcoder_status(State(state): State<AppState>) -> Json<TranscoderStatus> {
    Json(state.pipeline.transcoder_status().await)
}

pub fn diagnostics_routes() -> Router<AppState> {
    Router::new().route("/diagnostics/transcoder", get(transcoder_status))
}
