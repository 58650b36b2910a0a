// Spectral contrast - peak/valley energy difference per octave band
//
// Band edges: [0, 200, 400, 800, 1600, 3200, 6400, Nyquist]. Each band
// borrows the bin just below its lower edge; inner bands drop their top bin;
// the last band runs up to Nyquist.

use super::stft::{bin_frequencies, Spectrogram};
use super::mean_over_frames;
use crate::features::{FeatureError, N_CONTRAST};
use std::ops::Range;

const FMIN_HZ: f32 = 200.0;
const QUANTILE: f32 = 0.02;
const AMIN: f32 = 1e-10;

/// Precomputed bin ranges for the 7 contrast bands
pub struct OctaveBands {
    bands: Vec<Band>,
}

struct Band {
    bins: Range<usize>,
    /// Number of bins averaged for the peak and for the valley
    quantile_bins: usize,
}

impl OctaveBands {
    pub fn new(sample_rate: u32, n_fft: usize) -> Result<Self, FeatureError> {
        let n_bands = N_CONTRAST - 1;
        let nyquist = sample_rate as f32 / 2.0;
        let freqs = bin_frequencies(sample_rate, n_fft);

        let mut edges = vec![0.0_f32];
        edges.extend((0..=n_bands).map(|i| FMIN_HZ * 2_f32.powi(i as i32)));

        if let Some(&band_hz) = edges[..=n_bands].iter().find(|&&e| e >= nyquist) {
            return Err(FeatureError::BandExceedsNyquist {
                band_hz,
                nyquist_hz: nyquist,
            });
        }

        let mut bands = Vec::with_capacity(N_CONTRAST);
        for k in 0..=n_bands {
            let (low, high) = (edges[k], edges[k + 1]);

            let mut first = freqs.iter().position(|&f| f >= low).unwrap_or(freqs.len());
            let mut last = freqs.iter().rposition(|&f| f <= high).unwrap_or(0);
            if k > 0 {
                first = first.saturating_sub(1);
            }
            if k == n_bands {
                last = freqs.len() - 1;
            }
            if first > last {
                return Err(FeatureError::BandExceedsNyquist {
                    band_hz: low,
                    nyquist_hz: nyquist,
                });
            }

            let selected = last - first + 1;
            let end = if k < n_bands { last } else { last + 1 };
            let quantile_bins = ((QUANTILE * selected as f32).round() as usize).max(1);

            bands.push(Band {
                bins: first..end.max(first + 1),
                quantile_bins,
            });
        }

        Ok(Self { bands })
    }

    /// Frame-averaged contrast in dB, one value per band
    pub fn contrast(&self, spectrogram: &Spectrogram) -> Vec<f32> {
        let frames: Vec<Vec<f32>> = spectrogram
            .magnitudes()
            .iter()
            .map(|frame| self.bands.iter().map(|band| band.contrast(frame)).collect())
            .collect();

        mean_over_frames(&frames, N_CONTRAST)
    }
}

impl Band {
    fn contrast(&self, frame: &[f32]) -> f32 {
        let mut sorted = frame[self.bins.clone()].to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q = self.quantile_bins.min(sorted.len());
        let valley = sorted[..q].iter().sum::<f32>() / q as f32;
        let peak = sorted[sorted.len() - q..].iter().sum::<f32>() / q as f32;

        to_db(peak) - to_db(valley)
    }
}

fn to_db(x: f32) -> f32 {
    10.0 * x.max(AMIN).log10()
}
