// Chroma energy - power folded onto the 12 pitch classes (C = 0)

use super::stft::{bin_frequencies, Spectrogram, N_FFT};
use super::mean_over_frames;
use crate::features::N_CHROMA;

/// Bins below this frequency carry no usable pitch information
const MIN_CHROMA_HZ: f32 = 30.0;

/// Pitch class of a frequency, A4 = 440 Hz tuning
fn pitch_class(hz: f32) -> usize {
    let midi = 12.0 * (hz / 440.0).log2() + 69.0;
    (midi.round() as i64).rem_euclid(N_CHROMA as i64) as usize
}

/// Frame-averaged chroma, each frame normalised by its loudest class
pub fn chroma(spectrogram: &Spectrogram) -> Vec<f32> {
    let classes: Vec<Option<usize>> = bin_frequencies(spectrogram.sample_rate(), N_FFT)
        .into_iter()
        .map(|f| (f >= MIN_CHROMA_HZ).then(|| pitch_class(f)))
        .collect();

    let frames: Vec<Vec<f32>> = spectrogram
        .power()
        .map(|power| {
            let mut energy = vec![0.0_f32; N_CHROMA];
            for (p, class) in power.iter().zip(&classes) {
                if let Some(c) = class {
                    energy[*c] += p;
                }
            }

            let max = energy.iter().copied().fold(0.0_f32, f32::max);
            if max > f32::MIN_POSITIVE {
                energy.iter_mut().for_each(|e| *e /= max);
            }
            energy
        })
        .collect();

    mean_over_frames(&frames, N_CHROMA)
}
