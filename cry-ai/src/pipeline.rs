//! End-to-end prediction pipeline
//!
//! upload → scratch file → normalizer → decoder → feature extractor →
//! classifier → [`PredictionResult`]
//!
//! Only storage I/O and task-join failures escape as [`PipelineError`]; every
//! audio or model problem is absorbed by the fallback tiers and ends in a
//! (possibly default) prediction.

use crate::audio::{AudioDecoder, AudioUpload, FormatNormalizer, TranscoderStatus};
use crate::classifier::{Classification, ClassificationSource, ClassifierAdapter, CryLabel};
use crate::features::{ExtractionOutcome, FeatureExtractor};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of per-request scratch directories
const SCRATCH_PREFIX: &str = "cry-";

/// Pipeline errors surfaced to the HTTP layer
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload carried no bytes
    #[error("Audio payload is empty")]
    EmptyUpload,

    /// Scratch storage could not be created or written
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Blocking task was cancelled or panicked
    #[error("Processing task failed: {0}")]
    Task(String),
}

/// Final, immutable prediction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: CryLabel,
    /// Rounded to 3 decimals, within [0, 1]
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub source: ClassificationSource,
}

/// Attach the rounded confidence and a UTC timestamp
pub fn assemble(classification: &Classification) -> PredictionResult {
    PredictionResult {
        label: classification.label,
        confidence: round3(classification.confidence),
        timestamp: cry_common::time::now(),
        source: classification.source,
    }
}

/// Round to 3 decimals, clamped to [0, 1]
pub fn round3(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    ((value * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}

/// Prediction pipeline shared by all requests
pub struct CryPipeline {
    normalizer: FormatNormalizer,
    decoder: AudioDecoder,
    extractor: FeatureExtractor,
    classifier: ClassifierAdapter,
    storage_dir: PathBuf,
}

impl CryPipeline {
    pub fn new(
        normalizer: FormatNormalizer,
        classifier: ClassifierAdapter,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            normalizer,
            decoder: AudioDecoder::new(),
            extractor: FeatureExtractor::new(),
            classifier,
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub async fn transcoder_status(&self) -> TranscoderStatus {
        self.normalizer.transcoder_status().await
    }

    /// Run one upload through the full pipeline
    pub async fn analyze(&self, upload: AudioUpload) -> Result<PredictionResult, PipelineError> {
        if upload.is_empty() {
            return Err(PipelineError::EmptyUpload);
        }

        let request_id = Uuid::new_v4();
        debug!(
            %request_id,
            bytes = upload.bytes().len(),
            filename = upload.filename().unwrap_or("-"),
            content_type = upload.content_type().unwrap_or("-"),
            "Received audio upload"
        );

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.storage_dir)?;

        let input_path = scratch
            .path()
            .join(format!("upload.{}", upload.storage_extension()));
        tokio::fs::write(&input_path, upload.bytes()).await?;

        let declared_extension = upload.declared_extension();
        let decodable = self
            .normalizer
            .normalize(&input_path, declared_extension.as_deref(), upload.content_type())
            .await;

        let extraction = self.extract(request_id, decodable).await;
        if matches!(
            extraction,
            ExtractionOutcome::Degraded { .. } | ExtractionOutcome::Failed { .. }
        ) {
            warn!(%request_id, tier = extraction.tier(), "Feature extraction fell back");
        }

        let features = extraction.features();
        let classifier = self.classifier.clone();
        let classification = tokio::task::spawn_blocking(move || classifier.classify(&features))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?;

        if let Err(e) = scratch.close() {
            warn!(%request_id, error = %e, "Failed to remove scratch directory");
        }

        let result = assemble(&classification);
        info!(
            %request_id,
            label = %result.label,
            confidence = result.confidence,
            tier = extraction.tier(),
            source = ?result.source,
            "Prediction complete"
        );
        Ok(result)
    }

    /// Decode and extract on the blocking pool
    ///
    /// A panic inside decoding or extraction is treated as a total extraction
    /// failure rather than a request failure.
    async fn extract(&self, request_id: Uuid, path: PathBuf) -> ExtractionOutcome {
        let decoder = self.decoder.clone();
        let extractor = self.extractor.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(&path);
            extractor.extract_from(&decoded)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%request_id, error = %e, "Feature extraction task aborted");
                ExtractionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.31), 0.31);
        assert_eq!(round3(0.123456), 0.123);
        assert_eq!(round3(0.6666), 0.667);
        assert_eq!(round3(1.0004), 1.0);
        assert_eq!(round3(-0.2), 0.0);
        assert_eq!(round3(f64::NAN), 0.0);
    }

    #[test]
    fn test_assemble_default() {
        let classification = Classification {
            label: CryLabel::Discomfort,
            confidence: 0.31,
            source: ClassificationSource::ZeroInput,
        };
        let before = Utc::now();
        let result = assemble(&classification);

        assert_eq!(result.label, CryLabel::Discomfort);
        assert_eq!(result.confidence, 0.31);
        assert!(result.timestamp >= before);
        assert!(result.timestamp <= Utc::now());
    }
}
