//! Phase-accumulating oscillators.
//!
//! Frequency may change on every sample; the phase is carried across
//! changes, so pitch glides never click.

use std::f64::consts::PI;

use crate::mapping::triangle_sample;

/// Supported timbres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Plain triangle, used by the trend/compare presets and the realtime voices.
    Triangle,
    /// Warm organ: four harmonics fading toward the top.
    Organ,
    /// Bright string/synth: six harmonics with strong upper partials.
    Bright,
}

const ORGAN_PARTIALS: [f64; 4] = [1.0, 0.5, 0.25, 0.1];
const BRIGHT_PARTIALS: [f64; 6] = [1.0, 0.8, 0.6, 0.45, 0.3, 0.18];

impl Waveform {
    /// Evaluate the waveform at a period-normalised phase.
    pub fn sample_at(self, phase: f64) -> f64 {
        match self {
            Waveform::Triangle => triangle_sample(phase),
            Waveform::Organ => harmonic_sum(&ORGAN_PARTIALS, phase),
            Waveform::Bright => harmonic_sum(&BRIGHT_PARTIALS, phase),
        }
    }
}

/// Sum of sine partials `k = 1..=n` weighted by `amps[k - 1]`.
fn harmonic_sum(amps: &[f64], phase: f64) -> f64 {
    let angle = 2.0 * PI * phase;
    amps.iter()
        .enumerate()
        .map(|(k, &a)| a * ((k + 1) as f64 * angle).sin())
        .sum()
}

/// A single oscillator whose phase survives frequency changes.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    /// Phase in cycles, wrapped to `[0, 1)`.
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Emit the sample at the current phase, then advance by `freq`.
    pub fn next_sample(&mut self, freq: f64) -> f64 {
        let sample = self.waveform.sample_at(self.phase);
        self.phase = (self.phase + freq / self.sample_rate).rem_euclid(1.0);
        sample
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

/// Detuned unison stack: one oscillator per ratio, averaged.
#[derive(Debug, Clone)]
pub struct Unison {
    voices: Vec<(Oscillator, f64)>,
}

impl Unison {
    pub fn new(waveform: Waveform, sample_rate: f64, ratios: &[f64]) -> Self {
        Unison {
            voices: ratios
                .iter()
                .map(|&r| (Oscillator::new(waveform, sample_rate), r))
                .collect(),
        }
    }

    pub fn next_sample(&mut self, freq: f64) -> f64 {
        if self.voices.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .voices
            .iter_mut()
            .map(|(osc, ratio)| osc.next_sample(freq * *ratio))
            .sum();
        sum / self.voices.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_starts_at_minus_one() {
        let mut osc = Oscillator::new(Waveform::Triangle, 24000.0);
        assert_eq!(osc.next_sample(440.0), -1.0);
    }

    #[test]
    fn triangle_range() {
        let mut osc = Oscillator::new(Waveform::Triangle, 44100.0);
        for _ in 0..44100 {
            let s = osc.next_sample(440.0);
            assert!((-1.0..=1.0).contains(&s), "Triangle out of range: {s}");
        }
    }

    #[test]
    fn harmonic_timbres_start_at_zero() {
        assert!(Waveform::Organ.sample_at(0.0).abs() < 1e-12);
        assert!(Waveform::Bright.sample_at(0.0).abs() < 1e-12);
    }

    #[test]
    fn organ_peak_is_bounded_by_partial_sum() {
        let bound: f64 = ORGAN_PARTIALS.iter().sum();
        for i in 0..1000 {
            let s = Waveform::Organ.sample_at(i as f64 / 1000.0);
            assert!(s.abs() <= bound + 1e-9);
        }
    }

    #[test]
    fn phase_carries_across_frequency_change() {
        let mut osc = Oscillator::new(Waveform::Triangle, 1000.0);
        for _ in 0..3 {
            osc.next_sample(100.0);
        }
        let before = osc.phase();
        osc.next_sample(250.0);
        assert!((osc.phase() - (before + 0.25)).abs() < 1e-12);
    }

    #[test]
    fn unison_of_one_matches_single_voice() {
        let mut single = Oscillator::new(Waveform::Bright, 8000.0);
        let mut stack = Unison::new(Waveform::Bright, 8000.0, &[1.0]);
        for _ in 0..200 {
            assert!((single.next_sample(330.0) - stack.next_sample(330.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn detuned_voices_drift_apart() {
        let mut stack = Unison::new(Waveform::Bright, 8000.0, &[1.0, 1.015, 0.985]);
        let mut plain = Unison::new(Waveform::Bright, 8000.0, &[1.0, 1.0, 1.0]);
        let mut max_diff = 0.0_f64;
        for _ in 0..8000 {
            max_diff = max_diff.max((stack.next_sample(200.0) - plain.next_sample(200.0)).abs());
        }
        assert!(max_diff > 0.1, "detune should audibly change the waveform");
    }
}
