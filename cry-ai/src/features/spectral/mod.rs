//! Spectral feature path (STFT-based)
//!
//! Conventions follow the usual librosa defaults: `n_fft = 2048`,
//! `hop = 512`, periodic Hann window, centered frames. Values are averaged
//! over frames. Numeric parity with any particular library is not a goal;
//! the role and order of each segment is.

mod chroma;
mod contrast;
mod mel;
mod stft;
mod zcr;

pub use stft::{Spectrogram, HOP_LENGTH, N_FFT};

use super::{FeatureError, FeatureVector};

/// Compute the 60-value primary feature vector
pub fn extract(samples: &[f32], sample_rate: u32) -> Result<FeatureVector, FeatureError> {
    if samples.is_empty() {
        return Err(FeatureError::Empty);
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(FeatureError::NonFinite("input"));
    }

    // Cheapest failure first: band layout only depends on the sample rate
    let bands = contrast::OctaveBands::new(sample_rate, N_FFT)?;

    let spectrogram = Spectrogram::compute(samples, sample_rate);

    let cepstral = mel::mfcc(&spectrogram);
    let chroma = chroma::chroma(&spectrogram);
    let contrast = bands.contrast(&spectrogram);
    let zcr = zcr::zero_crossing_rate(samples);

    let features = FeatureVector::from_segments(&cepstral, &chroma, &contrast, zcr)?;
    if !features.is_finite() {
        let segment = if cepstral.iter().any(|v| !v.is_finite()) {
            "cepstral"
        } else if chroma.iter().any(|v| !v.is_finite()) {
            "chroma"
        } else if contrast.iter().any(|v| !v.is_finite()) {
            "contrast"
        } else {
            "zcr"
        };
        return Err(FeatureError::NonFinite(segment));
    }

    Ok(features)
}

/// Per-column mean of frame rows
fn mean_over_frames(rows: &[Vec<f32>], width: usize) -> Vec<f32> {
    let mut mean = vec![0.0_f64; width];
    if rows.is_empty() {
        return vec![0.0; width];
    }
    for row in rows {
        for (acc, &v) in mean.iter_mut().zip(row) {
            *acc += v as f64;
        }
    }
    mean.iter().map(|&v| (v / rows.len() as f64) as f32).collect()
}
