//! Shared mapping: pitch map, value normalisation, triangle waveform and
//! chord tables.
//!
//! Every renderer (offline presets and the realtime engine) goes through
//! these functions so that the same value always lands on the same pitch
//! and the same correlation always lands on the same interval.

use serde::{Deserialize, Serialize};

/// Reference pitch of the realtime engine's lead voice (A3).
pub const BASE_FREQUENCY: f64 = 220.0;
/// Master gain of the realtime graph when the harmony layer is on.
pub const MASTER_GAIN: f64 = 0.12;
/// Per-voice gain of the realtime graph.
pub const OSC_GAIN: f64 = 0.5;

/// Lowest pitch of the offline mapping (quiet / low-value points).
pub const PITCH_MIN_HZ: f64 = 110.0;
/// Octaves spanned between the lowest and highest mapped pitch.
pub const PITCH_OCTAVES: f64 = 3.0;

/// Map a normalised value `[0, 1]` to a frequency in Hz.
///
/// Exponential spacing (110 Hz → 880 Hz over three octaves) so equal steps
/// in the data sound like equal musical steps. Out-of-range input clamps.
pub fn norm_to_freq(norm: f64) -> f64 {
    pitch_from(PITCH_MIN_HZ, norm)
}

/// Same exponential three-octave mapping with a caller-supplied floor pitch.
pub fn pitch_from(min_hz: f64, norm: f64) -> f64 {
    min_hz * 2.0_f64.powf(PITCH_OCTAVES * norm.clamp(0.0, 1.0))
}

/// Value normalisation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    /// `(v - min) / (max - min)`.
    #[default]
    MinMax,
    /// z-score centred at 0.5 spanning ±3σ, clipped to `[0, 1]`.
    ZScore,
}

/// Normalise values to `[0, 1]`.
///
/// Degenerate input never divides by zero: an empty slice gives an empty
/// vector, and a zero range (or zero σ) is floored to 1.
pub fn normalize_values(values: &[f64], method: NormalizeMethod) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    match method {
        NormalizeMethod::ZScore => {
            let (mean, sigma) = mean_and_sigma(values);
            values
                .iter()
                .map(|&v| ((v - mean) / (sigma * 3.0) + 0.5).clamp(0.0, 1.0))
                .collect()
        }
        NormalizeMethod::MinMax => {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = floor_to_one(max - min);
            values.iter().map(|&v| (v - min) / range).collect()
        }
    }
}

/// Population mean and standard deviation; σ is floored to 1 when zero.
pub fn mean_and_sigma(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, floor_to_one(variance.sqrt()))
}

fn floor_to_one(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() { 1.0 } else { x }
}

/// Triangle wave from a period-normalised phase.
///
/// -1 at phase 0, 0 at 0.25, +1 at 0.5, 0 at 0.75. Periodic: any phase is
/// reduced modulo 1 first.
pub fn triangle_sample(phase_norm: f64) -> f64 {
    let tp = phase_norm.rem_euclid(1.0);
    if tp < 0.5 { 4.0 * tp - 1.0 } else { 3.0 - 4.0 * tp }
}

/// Interval played between the two realtime voices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordState {
    Fifth,
    Third,
    #[default]
    Unison,
    Tritone,
}

impl ChordState {
    pub const ALL: [ChordState; 4] = [
        ChordState::Fifth,
        ChordState::Third,
        ChordState::Unison,
        ChordState::Tritone,
    ];

    /// Frequency ratio of the upper voice over the base voice.
    pub fn ratio(self) -> f64 {
        match self {
            ChordState::Fifth => 3.0 / 2.0,
            ChordState::Third => 5.0 / 4.0,
            ChordState::Unison => 1.0,
            ChordState::Tritone => std::f64::consts::SQRT_2,
        }
    }

    /// Human-readable interval name.
    pub fn name(self) -> &'static str {
        match self {
            ChordState::Fifth => "perfect fifth (3:2)",
            ChordState::Third => "major third (5:4)",
            ChordState::Unison => "unison (1:1)",
            ChordState::Tritone => "tritone (sqrt(2):1)",
        }
    }

    /// Wire identifier (`"fifth"`, `"third"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ChordState::Fifth => "fifth",
            ChordState::Third => "third",
            ChordState::Unison => "unison",
            ChordState::Tritone => "tritone",
        }
    }

    /// Classify a smoothed correlation. A missing value counts as 0.
    pub fn from_rho_e(rho_e: Option<f64>) -> Self {
        let r = rho_e.unwrap_or(0.0);
        if r > 0.65 {
            ChordState::Fifth
        } else if r > 0.25 {
            ChordState::Third
        } else if r < -0.25 {
            ChordState::Tritone
        } else {
            ChordState::Unison
        }
    }
}

impl std::fmt::Display for ChordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_to_freq_endpoints() {
        assert_eq!(norm_to_freq(0.0), 110.0);
        assert!((norm_to_freq(1.0) - 880.0).abs() < 1e-9);
        assert!((norm_to_freq(0.5) - 110.0 * 2.0_f64.powf(1.5)).abs() < 1e-9);
    }

    #[test]
    fn norm_to_freq_clamps() {
        assert_eq!(norm_to_freq(-3.0), norm_to_freq(0.0));
        assert_eq!(norm_to_freq(7.5), norm_to_freq(1.0));
    }

    #[test]
    fn norm_to_freq_strictly_increasing() {
        let mut prev = norm_to_freq(0.0);
        for i in 1..=100 {
            let f = norm_to_freq(i as f64 / 100.0);
            assert!(f > prev, "not increasing at step {i}: {f} <= {prev}");
            prev = f;
        }
    }

    #[test]
    fn minmax_basic() {
        assert_eq!(
            normalize_values(&[10.0, 20.0, 30.0], NormalizeMethod::MinMax),
            vec![0.0, 0.5, 1.0]
        );
    }

    #[test]
    fn minmax_flat_is_zero() {
        assert_eq!(
            normalize_values(&[5.0, 5.0, 5.0], NormalizeMethod::MinMax),
            vec![0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(normalize_values(&[], NormalizeMethod::MinMax).is_empty());
        assert!(normalize_values(&[], NormalizeMethod::ZScore).is_empty());
    }

    #[test]
    fn zscore_centres_and_clips() {
        let out = normalize_values(&[1.0, 2.0, 3.0], NormalizeMethod::ZScore);
        assert!((out[1] - 0.5).abs() < 1e-12);
        assert!(out[0] < 0.5 && out[2] > 0.5);

        let outlier = normalize_values(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1000.0], NormalizeMethod::ZScore);
        assert!(outlier.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(outlier[9], 1.0);
    }

    #[test]
    fn zscore_flat_sits_in_the_middle() {
        let out = normalize_values(&[4.0, 4.0], NormalizeMethod::ZScore);
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn triangle_key_points() {
        assert_eq!(triangle_sample(0.0), -1.0);
        assert_eq!(triangle_sample(0.25), 0.0);
        assert_eq!(triangle_sample(0.5), 1.0);
        assert_eq!(triangle_sample(0.75), 0.0);
        assert_eq!(triangle_sample(1.0), triangle_sample(0.0));
        assert!((triangle_sample(1.25) - triangle_sample(0.25)).abs() < 1e-12);
    }

    #[test]
    fn chord_classifier_thresholds() {
        assert_eq!(ChordState::from_rho_e(Some(0.7)), ChordState::Fifth);
        assert_eq!(ChordState::from_rho_e(Some(0.3)), ChordState::Third);
        assert_eq!(ChordState::from_rho_e(Some(-0.5)), ChordState::Tritone);
        assert_eq!(ChordState::from_rho_e(Some(0.0)), ChordState::Unison);
        assert_eq!(ChordState::from_rho_e(None), ChordState::Unison);
        // Boundaries are exclusive.
        assert_eq!(ChordState::from_rho_e(Some(0.65)), ChordState::Third);
        assert_eq!(ChordState::from_rho_e(Some(-0.25)), ChordState::Unison);
    }

    #[test]
    fn chord_tables() {
        assert_eq!(ChordState::Fifth.ratio(), 1.5);
        assert_eq!(ChordState::Third.ratio(), 1.25);
        assert_eq!(ChordState::Unison.ratio(), 1.0);
        assert!((ChordState::Tritone.ratio() - 2.0_f64.sqrt()).abs() < 1e-15);
        for chord in ChordState::ALL {
            assert!(!chord.name().is_empty());
        }
        assert_eq!(ChordState::Third.name(), "major third (5:4)");
    }

    #[test]
    fn chord_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ChordState::Tritone).unwrap();
        assert_eq!(json, "\"tritone\"");
        let back: ChordState = serde_json::from_str("\"fifth\"").unwrap();
        assert_eq!(back, ChordState::Fifth);
    }
}
