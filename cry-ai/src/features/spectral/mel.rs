// Mel filterbank and cepstral coefficients
//
// Slaney-style mel scale and area normalisation, log power in dB with an
// 80 dB dynamic range floor, orthonormal DCT-II.

use super::stft::{bin_frequencies, Spectrogram, N_FFT};
use super::mean_over_frames;
use crate::features::N_CEPSTRAL;

/// Number of mel bands feeding the DCT
pub const N_MELS: usize = 128;

const AMIN: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular filter: weights for a contiguous run of FFT bins
struct MelFilter {
    first_bin: usize,
    weights: Vec<f32>,
}

/// Mel filterbank spanning 0 Hz to Nyquist
pub struct MelFilterbank {
    filters: Vec<MelFilter>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let fft_freqs = bin_frequencies(sample_rate, n_fft);
        let max_mel = hz_to_mel(sample_rate as f64 / 2.0);

        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let filters = (0..n_mels)
            .map(|m| {
                let (lower, centre, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (upper - lower);

                let weights: Vec<(usize, f32)> = fft_freqs
                    .iter()
                    .enumerate()
                    .filter_map(|(k, &f)| {
                        let f = f as f64;
                        let rising = (f - lower) / (centre - lower);
                        let falling = (upper - f) / (upper - centre);
                        let w = rising.min(falling).max(0.0) * enorm;
                        (w > 0.0).then_some((k, w as f32))
                    })
                    .collect();

                MelFilter {
                    first_bin: weights.first().map(|&(k, _)| k).unwrap_or(0),
                    weights: weights.into_iter().map(|(_, w)| w).collect(),
                }
            })
            .collect();

        Self { filters }
    }

    /// Project one power spectrum frame onto the mel bands
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|filter| {
                power[filter.first_bin..]
                    .iter()
                    .zip(&filter.weights)
                    .map(|(p, w)| p * w)
                    .sum()
            })
            .collect()
    }
}

/// Orthonormal DCT-II basis, `n_out` rows of `n_in` coefficients
fn dct_basis(n_in: usize, n_out: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..n_in)
                .map(|i| {
                    let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
                    (scale * angle.cos()) as f32
                })
                .collect()
        })
        .collect()
}

/// Frame-averaged cepstral coefficients
pub fn mfcc(spectrogram: &Spectrogram) -> Vec<f32> {
    let filterbank = MelFilterbank::new(spectrogram.sample_rate(), N_FFT, N_MELS);

    let mut log_mel: Vec<Vec<f32>> = spectrogram
        .power()
        .map(|frame| {
            filterbank
                .apply(&frame)
                .into_iter()
                .map(|e| 10.0 * e.max(AMIN).log10())
                .collect()
        })
        .collect();

    let peak = log_mel
        .iter()
        .flatten()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    for v in log_mel.iter_mut().flatten() {
        *v = v.max(floor);
    }

    let basis = dct_basis(N_MELS, N_CEPSTRAL);
    let coefficients: Vec<Vec<f32>> = log_mel
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame).map(|(b, x)| b * x).sum())
                .collect()
        })
        .collect();

    mean_over_frames(&coefficients, N_CEPSTRAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_round_trip() {
        for hz in [0.0, 440.0, 999.0, 1000.0, 4000.0, 11_025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(22_050, N_FFT, N_MELS);
        assert_eq!(bank.filters.len(), N_MELS);
        assert!(bank.filters.iter().all(|f| !f.weights.is_empty()));
    }

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(16, 16);
        for (i, a) in basis.iter().enumerate() {
            for (j, b) in basis.iter().enumerate() {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-4, "({i},{j}) = {dot}");
            }
        }
    }

    #[test]
    fn test_mfcc_length() {
        let spec = Spectrogram::compute(&vec![0.1; 11_025], 22_050);
        assert_eq!(mfcc(&spec).len(), N_CEPSTRAL);
    }
}
