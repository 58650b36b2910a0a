//! Basic time-domain statistics for the degraded feature layout

use super::N_BASIC;

/// `[mean, std, sign-change rate, energy]` of the raw samples
///
/// - std is the population standard deviation
/// - the sign-change rate counts positions where `sign(x[i]) != sign(x[i-1])`
///   with `sign(0) == 0`, divided by the sample count
/// - energy is the mean squared amplitude
///
/// An empty slice yields all zeros.
pub fn basic_statistics(samples: &[f32]) -> [f32; N_BASIC] {
    if samples.is_empty() {
        return [0.0; N_BASIC];
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let sign_changes = samples
        .windows(2)
        .filter(|w| sign(w[0]) != sign(w[1]))
        .count();
    let energy = samples.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / n;

    [
        mean as f32,
        variance.sqrt() as f32,
        (sign_changes as f64 / n) as f32,
        energy as f32,
    ]
}

fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
