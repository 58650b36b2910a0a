//! Classifier adapter
//!
//! Wraps an opaque pretrained model behind [`CryModel`] and turns its output
//! into a [`CryLabel`] with a confidence. The adapter never fails: degenerate
//! input and model errors both yield the fixed low-confidence default.

pub mod forest;

pub use forest::ForestModel;

use crate::features::FeatureVector;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Label returned when the model is skipped or fails
pub const DEFAULT_LABEL: CryLabel = CryLabel::Discomfort;
/// Confidence returned when the model is skipped or fails
pub const DEFAULT_CONFIDENCE: f64 = 0.31;

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact could not be read
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact is not valid JSON for the expected schema
    #[error("Failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Artifact parsed but violates a structural rule
    #[error("Invalid model: {0}")]
    Invalid(String),

    /// Input vector width does not match the model
    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
}

/// Cry categories, in the class-index order the model was trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CryLabel {
    #[serde(rename = "hunger")]
    Hunger,
    #[serde(rename = "tiredness")]
    Tiredness,
    #[serde(rename = "discomfort")]
    Discomfort,
    #[serde(rename = "needs attention")]
    NeedsAttention,
    #[serde(rename = "burping")]
    Burping,
}

impl CryLabel {
    /// Index → label table; index is the model's class index
    pub const ALL: [CryLabel; 5] = [
        CryLabel::Hunger,
        CryLabel::Tiredness,
        CryLabel::Discomfort,
        CryLabel::NeedsAttention,
        CryLabel::Burping,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CryLabel::Hunger => "hunger",
            CryLabel::Tiredness => "tiredness",
            CryLabel::Discomfort => "discomfort",
            CryLabel::NeedsAttention => "needs attention",
            CryLabel::Burping => "burping",
        }
    }
}

impl fmt::Display for CryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque pretrained classifier
///
/// Implementations are loaded once and shared read-only across requests.
pub trait CryModel: Send + Sync {
    /// Input width
    fn n_features(&self) -> usize;

    /// Number of classes in the probability distribution
    fn n_classes(&self) -> usize;

    /// Most likely class index
    fn predict(&self, features: &[f32]) -> Result<usize, ModelError>;

    /// Per-class probabilities, ordered by class index
    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, ModelError>;
}

/// Where a classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Model,
    /// All-zero input, model not invoked
    ZeroInput,
    /// Model invocation failed
    ModelError,
}

/// Label plus unrounded confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: CryLabel,
    pub confidence: f64,
    pub source: ClassificationSource,
}

impl Classification {
    fn fallback(source: ClassificationSource) -> Self {
        Self {
            label: DEFAULT_LABEL,
            confidence: DEFAULT_CONFIDENCE,
            source,
        }
    }
}

/// Maps model output to labels and confidences
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn CryModel>,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn CryModel>) -> Self {
        Self { model }
    }

    /// Classify a feature vector
    ///
    /// A vector summing to exactly zero never reaches the model.
    pub fn classify(&self, features: &FeatureVector) -> Classification {
        if features.is_zero_sentinel() {
            debug!("Zero feature vector, skipping model");
            return Classification::fallback(ClassificationSource::ZeroInput);
        }

        match self.run_model(features.as_slice()) {
            Ok((label, confidence)) => Classification {
                label,
                confidence,
                source: ClassificationSource::Model,
            },
            Err(e) => {
                warn!(error = %e, "Model invocation failed, using default prediction");
                Classification::fallback(ClassificationSource::ModelError)
            }
        }
    }

    fn run_model(&self, features: &[f32]) -> Result<(CryLabel, f64), ModelError> {
        let index = self.model.predict(features)?;
        let label = CryLabel::from_index(index)
            .ok_or_else(|| ModelError::Invalid(format!("class index {index} has no label")))?;

        let probabilities = self.model.predict_proba(features)?;
        if probabilities.len() != CryLabel::ALL.len() {
            return Err(ModelError::Invalid(format!(
                "expected {} probabilities, got {}",
                CryLabel::ALL.len(),
                probabilities.len()
            )));
        }

        let confidence = probabilities
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))
            .ok_or_else(|| ModelError::Invalid("no finite probabilities".to_string()))?;

        Ok((label, confidence.clamp(0.0, 1.0)))
    }
}
