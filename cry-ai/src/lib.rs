//! cry-ai library interface
//!
//! Infant cry classification: audio upload in, one of five cry categories
//! plus a confidence out. Exposed as a library so integration tests can
//! drive the router and pipeline directly.

pub mod api;
pub mod audio;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod models;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{CryPipeline, PredictionResult};

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CryPipeline>,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<CryPipeline>, max_upload_bytes: usize) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .merge(api::diagnostics_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
