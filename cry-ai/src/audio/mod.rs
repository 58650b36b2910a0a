//! Audio intake: upload model, format normalization and decoding
//!
//! Upload bytes are stored in a per-request scratch directory, normalized to
//! a canonical WAV container when possible, then decoded to a mono
//! [`Waveform`].

pub mod decoder;
pub mod normalizer;

pub use decoder::{AudioDecoder, DecodeError, DecodeOutcome, DecoderBackend};
pub use normalizer::{FormatNormalizer, NormalizeError, TranscoderStatus};

/// Minimum clip duration accepted for feature extraction, in seconds
pub const MIN_DURATION_SECS: f64 = 0.5;

/// Decoding stops after this much audio; the rest of a longer clip is ignored
pub const MAX_DURATION_SECS: f64 = 120.0;

/// Uploaded audio payload
///
/// Immutable once received; consumed by the pipeline and discarded after
/// decoding.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    bytes: Vec<u8>,
    filename: Option<String>,
    content_type: Option<String>,
}

impl AudioUpload {
    pub fn new(bytes: Vec<u8>, filename: Option<String>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            filename,
            content_type,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// File extension declared by the uploaded filename
    ///
    /// Lowercased; only ASCII alphanumeric extensions of at most 8 characters
    /// are accepted so the value is safe to use in a storage path.
    pub fn declared_extension(&self) -> Option<String> {
        let name = self.filename.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Extension used for the stored copy of the upload
    pub fn storage_extension(&self) -> String {
        self.declared_extension().unwrap_or_else(|| "bin".to_string())
    }
}

/// Mono PCM waveform
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Mono samples (f32, nominally in [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds (0.0 for a zero sample rate)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// True when the clip holds less than [`MIN_DURATION_SECS`] of audio
    pub fn is_too_short(&self) -> bool {
        (self.samples.len() as f64) < MIN_DURATION_SECS * self.sample_rate as f64
            || self.samples.is_empty()
    }
}

/// Downmix interleaved frames to mono by averaging channels
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
