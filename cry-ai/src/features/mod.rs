//! Fixed-length feature extraction
//!
//! Every path out of this module yields exactly [`FEATURE_LEN`] numbers:
//!
//! | Tier       | Layout                                                        |
//! |------------|---------------------------------------------------------------|
//! | `Success`  | cepstral(40) · chroma(12) · contrast(7) · zcr(1)              |
//! | `Degraded` | mean · std · sign-change rate · energy · zero padding (56)    |
//! | `TooShort` | all zeros                                                     |
//! | `Failed`   | all zeros                                                     |
//!
//! The classifier was trained on this exact layout; segment order is part of
//! the model contract.

pub mod basic;
#[cfg(feature = "spectral")]
pub mod spectral;

use crate::audio::{DecodeOutcome, Waveform};
use thiserror::Error;
use tracing::{debug, warn};

/// Feature vector length expected by the classifier
pub const FEATURE_LEN: usize = 60;
/// Number of cepstral coefficients
pub const N_CEPSTRAL: usize = 40;
/// Number of chroma bins
pub const N_CHROMA: usize = 12;
/// Number of spectral contrast bands (6 octave bands + residual)
pub const N_CONTRAST: usize = 7;
/// Number of basic statistics in the degraded layout
pub const N_BASIC: usize = 4;

pub const CEPSTRAL_OFFSET: usize = 0;
pub const CHROMA_OFFSET: usize = CEPSTRAL_OFFSET + N_CEPSTRAL;
pub const CONTRAST_OFFSET: usize = CHROMA_OFFSET + N_CHROMA;
pub const ZCR_OFFSET: usize = CONTRAST_OFFSET + N_CONTRAST;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Built without the `spectral` feature
    #[error("Spectral analysis not available in this build")]
    SpectralUnavailable,

    /// No samples to analyse
    #[error("Empty sample buffer")]
    Empty,

    /// A contrast band starts at or above Nyquist
    #[error("Frequency band at {band_hz} Hz exceeds Nyquist ({nyquist_hz} Hz)")]
    BandExceedsNyquist { band_hz: f32, nyquist_hz: f32 },

    /// Segment has the wrong number of values
    #[error("{segment} segment has {actual} values, expected {expected}")]
    SegmentLength {
        segment: &'static str,
        expected: usize,
        actual: usize,
    },

    /// NaN or infinity in the output
    #[error("Non-finite value in {0} features")]
    NonFinite(&'static str),
}

/// Exactly [`FEATURE_LEN`] feature values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_LEN]);

impl FeatureVector {
    /// All-zero sentinel for "extraction failed / too short"
    pub fn zeros() -> Self {
        Self([0.0; FEATURE_LEN])
    }

    /// Concatenate the primary-path segments in model order
    pub fn from_segments(
        cepstral: &[f32],
        chroma: &[f32],
        contrast: &[f32],
        zcr: f32,
    ) -> Result<Self, FeatureError> {
        check_len("cepstral", cepstral, N_CEPSTRAL)?;
        check_len("chroma", chroma, N_CHROMA)?;
        check_len("contrast", contrast, N_CONTRAST)?;

        let mut values = [0.0; FEATURE_LEN];
        values[CEPSTRAL_OFFSET..CHROMA_OFFSET].copy_from_slice(cepstral);
        values[CHROMA_OFFSET..CONTRAST_OFFSET].copy_from_slice(chroma);
        values[CONTRAST_OFFSET..ZCR_OFFSET].copy_from_slice(contrast);
        values[ZCR_OFFSET] = zcr;
        Ok(Self(values))
    }

    /// Degraded layout: four statistics followed by zero padding
    pub fn from_basic(stats: [f32; N_BASIC]) -> Self {
        let mut values = [0.0; FEATURE_LEN];
        values[..N_BASIC].copy_from_slice(&stats);
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn cepstral(&self) -> &[f32] {
        &self.0[CEPSTRAL_OFFSET..CHROMA_OFFSET]
    }

    pub fn chroma(&self) -> &[f32] {
        &self.0[CHROMA_OFFSET..CONTRAST_OFFSET]
    }

    pub fn contrast(&self) -> &[f32] {
        &self.0[CONTRAST_OFFSET..ZCR_OFFSET]
    }

    pub fn zcr(&self) -> f32 {
        self.0[ZCR_OFFSET]
    }

    /// Sum of all values, accumulated in f64
    pub fn sum(&self) -> f64 {
        self.0.iter().map(|&v| v as f64).sum()
    }

    /// True when the vector sums to exactly zero
    pub fn is_zero_sentinel(&self) -> bool {
        self.sum() == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<[f32; FEATURE_LEN]> for FeatureVector {
    fn from(values: [f32; FEATURE_LEN]) -> Self {
        Self(values)
    }
}

fn check_len(segment: &'static str, values: &[f32], expected: usize) -> Result<(), FeatureError> {
    if values.len() != expected {
        return Err(FeatureError::SegmentLength {
            segment,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Which fallback tier produced a feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Full spectral feature set
    Success(FeatureVector),
    /// Basic statistics only
    Degraded {
        features: FeatureVector,
        reason: String,
    },
    /// Clip under the minimum duration
    TooShort { duration_secs: f64 },
    /// Nothing usable
    Failed { reason: String },
}

impl ExtractionOutcome {
    /// The 60-length vector for this outcome (zeros for TooShort/Failed)
    pub fn features(&self) -> FeatureVector {
        match self {
            ExtractionOutcome::Success(features) => *features,
            ExtractionOutcome::Degraded { features, .. } => *features,
            ExtractionOutcome::TooShort { .. } | ExtractionOutcome::Failed { .. } => {
                FeatureVector::zeros()
            }
        }
    }

    /// Short tier name for logging
    pub fn tier(&self) -> &'static str {
        match self {
            ExtractionOutcome::Success(_) => "success",
            ExtractionOutcome::Degraded { .. } => "degraded",
            ExtractionOutcome::TooShort { .. } => "too_short",
            ExtractionOutcome::Failed { .. } => "failed",
        }
    }
}

/// Feature extractor: spectral path with a basic-statistics fallback
#[derive(Debug, Default, Clone)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Continue the ladder from a decoder outcome
    pub fn extract_from(&self, decoded: &DecodeOutcome) -> ExtractionOutcome {
        match decoded {
            DecodeOutcome::Decoded { waveform, .. } => self.extract(waveform),
            DecodeOutcome::TooShort { duration_secs, .. } => ExtractionOutcome::TooShort {
                duration_secs: *duration_secs,
            },
            DecodeOutcome::Failed { reason } => ExtractionOutcome::Failed {
                reason: reason.clone(),
            },
        }
    }

    /// Extract features from a waveform
    pub fn extract(&self, waveform: &Waveform) -> ExtractionOutcome {
        if waveform.is_too_short() {
            return ExtractionOutcome::TooShort {
                duration_secs: waveform.duration_secs(),
            };
        }

        let primary_error = match primary_features(waveform) {
            Ok(features) => {
                debug!(zcr = features.zcr(), "Spectral features extracted");
                return ExtractionOutcome::Success(features);
            }
            Err(e) => e,
        };

        warn!(error = %primary_error, "Spectral extraction failed, using basic statistics");

        let stats = basic::basic_statistics(&waveform.samples);
        if stats.iter().any(|v| !v.is_finite()) {
            return ExtractionOutcome::Failed {
                reason: format!("{primary_error}; basic statistics not finite"),
            };
        }

        ExtractionOutcome::Degraded {
            features: FeatureVector::from_basic(stats),
            reason: primary_error.to_string(),
        }
    }
}

#[cfg(feature = "spectral")]
fn primary_features(waveform: &Waveform) -> Result<FeatureVector, FeatureError> {
    spectral::extract(&waveform.samples, waveform.sample_rate)
}

#[cfg(not(feature = "spectral"))]
fn primary_features(_waveform: &Waveform) -> Result<FeatureVector, FeatureError> {
    Err(FeatureError::SpectralUnavailable)
}
