//! Cry classification endpoint
//!
//! POST /predict-type with a multipart form; the clip is in the `audio`
//! field. Other fields are ignored.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::audio::AudioUpload;
use crate::error::{ApiError, ApiResult};
use crate::models::PredictionResponse;
use crate::AppState;

/// Multipart field carrying the audio clip
pub const AUDIO_FIELD: &str = "audio";

/// POST /predict-type
pub async fn predict_type(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let upload = read_audio_field(&mut multipart).await?;

    let result = state.pipeline.analyze(upload).await?;
    Ok(Json(result.into()))
}

async fn read_audio_field(multipart: &mut Multipart) -> ApiResult<AudioUpload> {
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(field_error)?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyAudio);
        }

        return Ok(AudioUpload::new(bytes.to_vec(), filename, content_type));
    }

    Err(ApiError::MissingAudio)
}

fn field_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict-type", post(predict_type))
}
