//! Biquad low-pass filter — 2nd-order Butterworth.
//!
//! Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson),
//! run as a direct-form I recursion.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// A 2nd-order IIR low-pass section.
#[derive(Debug, Clone)]
pub struct Biquad {
    pub cutoff: f64,
    pub q: f64,

    // Coefficients, normalised by a0
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // State (direct form I)
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,

    sample_rate: f64,
}

impl Biquad {
    /// Butterworth (`Q = 1/√2`) low-pass at `cutoff` Hz.
    ///
    /// The cutoff is capped just below Nyquist.
    pub fn butterworth_lowpass(cutoff: f64, sample_rate: f64) -> Self {
        let mut f = Biquad {
            cutoff,
            q: FRAC_1_SQRT_2,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    /// Recompute filter coefficients from current parameters.
    fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.cutoff.min(self.sample_rate * 0.499) / self.sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * self.q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, x0: f64) -> f64 {
        let y0 = self.b0 * x0 + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;
        y0
    }

    /// Filter a whole buffer from a cleared state.
    pub fn process_buffer(&mut self, input: &[f64]) -> Vec<f64> {
        self.reset();
        input.iter().map(|&x| self.process(x)).collect()
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Convenience: low-pass `input` at `cutoff` Hz.
pub fn lowpass(input: &[f64], cutoff: f64, sample_rate: f64) -> Vec<f64> {
    Biquad::butterworth_lowpass(cutoff, sample_rate).process_buffer(input)
}
