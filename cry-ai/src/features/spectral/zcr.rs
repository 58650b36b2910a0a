// Frame-wise zero-crossing rate
//
// Frames match the STFT grid (N_FFT / HOP_LENGTH, centered) but the signal
// is edge-padded. Zero counts as positive.

use super::stft::{HOP_LENGTH, N_FFT};

pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    let (Some(&first), Some(&last)) = (samples.first(), samples.last()) else {
        return 0.0;
    };

    let pad = N_FFT / 2;
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.extend(std::iter::repeat(first).take(pad));
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(last).take(pad));

    let n_frames = 1 + (padded.len() - N_FFT) / HOP_LENGTH;
    let total: f64 = (0..n_frames)
        .map(|frame| {
            let start = frame * HOP_LENGTH;
            let crossings = padded[start..start + N_FFT]
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            crossings as f64 / N_FFT as f64
        })
        .sum();

    (total / n_frames as f64) as f32
}
