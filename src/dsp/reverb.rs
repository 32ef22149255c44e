//! Reverb effect — parallel comb-delay taps.
//!
//! Each tap reads the dry signal `delay` ms earlier, scales it by `decay`,
//! and adds it to the output. No feedback, so the tail length is bounded by
//! the longest tap.

/// A single early reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombTap {
    /// Delay in milliseconds.
    pub delay_ms: f64,
    /// Gain applied to the delayed copy.
    pub decay: f64,
}

impl CombTap {
    pub const fn new(delay_ms: f64, decay: f64) -> Self {
        CombTap { delay_ms, decay }
    }

    /// Tap delay in whole samples.
    pub fn delay_samples(&self, sample_rate: f64) -> usize {
        (sample_rate * self.delay_ms / 1000.0).round().max(0.0) as usize
    }
}

/// Small, close room.
pub const WARM_ROOM: [CombTap; 3] = [
    CombTap::new(18.0, 0.20),
    CombTap::new(37.0, 0.12),
    CombTap::new(58.0, 0.07),
];

/// Larger, more reflective room.
pub const SPACIOUS_ROOM: [CombTap; 4] = [
    CombTap::new(28.0, 0.45),
    CombTap::new(55.0, 0.32),
    CombTap::new(90.0, 0.20),
    CombTap::new(135.0, 0.12),
];

/// Short tail used on individual plucked notes.
pub const PLUCK_ROOM: [CombTap; 2] = [CombTap::new(28.0, 0.35), CombTap::new(55.0, 0.20)];

/// A fixed set of parallel taps.
#[derive(Debug, Clone)]
pub struct Reverb {
    taps: Vec<CombTap>,
    sample_rate: f64,
}

impl Reverb {
    pub fn new(sample_rate: f64, taps: &[CombTap]) -> Self {
        Reverb {
            taps: taps.to_vec(),
            sample_rate,
        }
    }

    /// Dry signal plus every tap. Taps longer than the buffer are skipped.
    pub fn process(&self, dry: &[f64]) -> Vec<f64> {
        let mut wet = dry.to_vec();
        for tap in &self.taps {
            let d = tap.delay_samples(self.sample_rate);
            if d >= wet.len() {
                continue;
            }
            for i in d..wet.len() {
                wet[i] += dry[i - d] * tap.decay;
            }
        }
        wet
    }
}
