//! Catmull-Rom cubic interpolation for upsampling per-day curves.

/// Catmull-Rom segment between `p1` and `p2` at `t ∈ [0, 1]`.
pub fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Resample `values` onto `total_samples` points spanning the same range.
///
/// The first output equals `values[0]` and the last equals the final value.
/// The 4-point stencil is clamped at both ends of the sequence.
pub fn upsample(values: &[f64], total_samples: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || total_samples == 0 {
        return vec![0.0; total_samples];
    }
    let last = n - 1;
    let span = (total_samples.max(2) - 1) as f64;

    (0..total_samples)
        .map(|i| {
            let t = i as f64 / span * last as f64;
            let idx = (t.floor() as usize).min(last);
            let frac = t - idx as f64;
            let p0 = values[idx.saturating_sub(1)];
            let p1 = values[idx];
            let p2 = values[(idx + 1).min(last)];
            let p3 = values[(idx + 2).min(last)];
            catmull_rom(p0, p1, p2, p3, frac)
        })
        .collect()
}
