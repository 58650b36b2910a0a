//! Test Helper Utilities
//!
//! Shared utilities for testing cry-ai

#![allow(dead_code)]

pub mod audio_generator;

pub use audio_generator::{generate_test_wav, wav_bytes, AudioConfig};

use cry_ai::audio::FormatNormalizer;
use cry_ai::classifier::{ClassifierAdapter, ForestModel};
use cry_ai::{AppState, CryPipeline};
use cry_common::config::TranscoderConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Multipart boundary used by [`multipart_body`]
pub const BOUNDARY: &str = "cry-test-boundary";

/// Classifier artifact shipped with the crate
pub fn bundled_model_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("models/cry_classifier.json")
}

pub fn transcoder_disabled() -> TranscoderConfig {
    TranscoderConfig {
        enabled: false,
        ..TranscoderConfig::default()
    }
}

/// Pipeline with the bundled model and the transcoder disabled
pub fn test_pipeline(storage_dir: &Path) -> CryPipeline {
    let model = ForestModel::load(&bundled_model_path()).expect("Bundled model must load");
    CryPipeline::new(
        FormatNormalizer::new(transcoder_disabled()),
        ClassifierAdapter::new(Arc::new(model)),
        storage_dir,
    )
}

/// Router over [`test_pipeline`]
pub fn test_app(storage_dir: &Path, max_upload_bytes: usize) -> axum::Router {
    let state = AppState::new(Arc::new(test_pipeline(storage_dir)), max_upload_bytes);
    cry_ai::build_router(state)
}

/// One file part of a multipart form
pub struct FilePart<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Encode a `multipart/form-data` body with [`BOUNDARY`]
pub fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Number of entries left in a directory
pub fn dir_entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
