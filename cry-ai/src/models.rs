//! HTTP request/response bodies

use crate::classifier::CryLabel;
use crate::pipeline::PredictionResult;
use cry_common::time::{now, to_iso8601};
use serde::Serialize;

/// Label reported when no prediction could be made
pub const UNKNOWN_LABEL: &str = "unknown";
/// Confidence reported alongside [`UNKNOWN_LABEL`]
pub const UNKNOWN_CONFIDENCE: f64 = 0.5;

/// POST /predict-type success body
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub cry_type: CryLabel,
    pub confidence: f64,
    pub timestamp: String,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            cry_type: result.label,
            confidence: result.confidence,
            timestamp: to_iso8601(&result.timestamp),
        }
    }
}

/// Error body: the sentinel prediction plus error details
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub cry_type: &'static str,
    pub confidence: f64,
    pub timestamp: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            cry_type: UNKNOWN_LABEL,
            confidence: UNKNOWN_CONFIDENCE,
            timestamp: to_iso8601(&now()),
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }
    }
}

/// GET /health body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}
