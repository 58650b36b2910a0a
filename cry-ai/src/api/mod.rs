//! HTTP API handlers for cry-ai

pub mod diagnostics;
pub mod health;
pub mod predict;

pub use diagnostics::diagnostics_routes;
pub use health::health_routes;
pub use predict::predict_routes;
