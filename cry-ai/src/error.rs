//! Error types for cry-ai
//!
//! Every error response carries the sentinel prediction (`unknown`, 0.5)
//! next to an error code and message.

use crate::models::ErrorResponse;
use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No `audio` field in the form (400)
    #[error("No audio file provided")]
    MissingAudio,

    /// `audio` field present but empty (400)
    #[error("Audio file is empty")]
    EmptyAudio,

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload over the configured size limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingAudio => (StatusCode::BAD_REQUEST, "MISSING_AUDIO"),
            ApiError::EmptyAudio => (StatusCode::BAD_REQUEST, "EMPTY_AUDIO"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            ApiError::Pipeline(PipelineError::EmptyUpload) => {
                (StatusCode::BAD_REQUEST, "EMPTY_AUDIO")
            }
            ApiError::Pipeline(PipelineError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            ApiError::Pipeline(PipelineError::Task(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse::new(code, self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::MissingAudio.parts().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Pipeline(PipelineError::EmptyUpload).parts().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Pipeline(PipelineError::Task("panicked".into())).parts().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Pipeline(PipelineError::Storage(std::io::Error::other("disk full"))).parts(),
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        );
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::BadRequest("not multipart".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
