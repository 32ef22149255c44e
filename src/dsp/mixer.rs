//! Mixer — peak normalisation, hard clipping and precision conversion.

/// Scale `samples` so the largest absolute value equals `target`.
///
/// Silent buffers are left untouched.
pub fn normalize_peak(samples: &mut [f64], target: f64) {
    let peak = peak_abs(samples);
    if peak > 0.0 {
        let gain = target / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}

/// Largest absolute sample value (0 for an empty buffer).
pub fn peak_abs(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()))
}

/// Clamp every sample to `[-1, 1]`.
pub fn hard_clip(samples: &mut [f64]) {
    for s in samples.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }
}

/// Narrow a working buffer to the f32 output format.
pub fn to_f32(samples: &[f64]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32).collect()
}
