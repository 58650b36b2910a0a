// STFT module - magnitude spectrogram shared by the spectral features
//
// Frames are centered: the signal is zero-padded by N_FFT / 2 on both
// sides, which gives 1 + n / HOP_LENGTH frames for n samples.

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT window size
pub const N_FFT: usize = 2048;
/// Hop between successive frames
pub const HOP_LENGTH: usize = 512;

/// Magnitude spectrogram, one row per frame, `N_FFT / 2 + 1` bins per row
pub struct Spectrogram {
    magnitudes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Spectrogram {
    pub fn compute(samples: &[f32], sample_rate: u32) -> Self {
        let pad = N_FFT / 2;
        let mut padded = vec![0.0_f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let window = hann_window(N_FFT);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(N_FFT);
        let n_frames = 1 + (padded.len() - N_FFT) / HOP_LENGTH;
        let n_bins = N_FFT / 2 + 1;

        let mut buffer = vec![Complex::new(0.0_f32, 0.0); N_FFT];
        let mut magnitudes = Vec::with_capacity(n_frames);

        for frame in 0..n_frames {
            let start = frame * HOP_LENGTH;
            for (slot, (&s, &w)) in buffer
                .iter_mut()
                .zip(padded[start..start + N_FFT].iter().zip(&window))
            {
                *slot = Complex::new(s * w, 0.0);
            }

            fft.process(&mut buffer);
            magnitudes.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
        }

        Self {
            magnitudes,
            sample_rate,
        }
    }

    /// Magnitude rows
    pub fn magnitudes(&self) -> &[Vec<f32>] {
        &self.magnitudes
    }

    /// Power rows (squared magnitude)
    pub fn power(&self) -> impl Iterator<Item = Vec<f32>> + '_ {
        self.magnitudes
            .iter()
            .map(|row| row.iter().map(|m| m * m).collect())
    }

    pub fn n_frames(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Centre frequency of each FFT bin
pub fn bin_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    (0..=n_fft / 2)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect()
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count() {
        let spec = Spectrogram::compute(&vec![0.0; 22_050], 22_050);
        assert_eq!(spec.n_frames(), 1 + 22_050 / HOP_LENGTH);
        assert_eq!(spec.magnitudes()[0].len(), N_FFT / 2 + 1);
    }

    #[test]
    fn test_peak_bin_tracks_frequency() {
        let sr = 22_050;
        let freq = 1_000.0;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let spec = Spectrogram::compute(&samples, sr as u32);
        let middle = &spec.magnitudes()[spec.n_frames() / 2];
        let peak = middle
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let freqs = bin_frequencies(sr as u32, N_FFT);
        assert!((freqs[peak] - freq).abs() < 15.0);
    }

    #[test]
    fn test_hann_window_endpoints() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }
}
