//! Envelopes — edge fades, decaying tick bursts and pluck shapes.

use std::f64::consts::PI;

/// Linear fade-in over the first `fade_samples` and fade-out over the last.
///
/// Gain at the very first and very last sample is 0.
pub fn apply_edge_fades(samples: &mut [f64], fade_samples: usize) {
    let total = samples.len();
    if fade_samples == 0 {
        return;
    }
    for i in 0..fade_samples.min(total) {
        let gain = i as f64 / fade_samples as f64;
        samples[i] *= gain;
        samples[total - 1 - i] *= gain;
    }
}

/// Short exponentially decaying sine burst ("tick").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickBurst {
    pub freq: f64,
    pub gain: f64,
    /// Exponential decay rate in 1/s.
    pub decay: f64,
    pub duration_ms: f64,
}

impl TickBurst {
    /// Number of samples the burst lasts, rounded down.
    pub fn len_floor(&self, sample_rate: f64) -> usize {
        (sample_rate * self.duration_ms / 1000.0).floor() as usize
    }

    /// Number of samples the burst lasts, rounded to nearest.
    pub fn len_round(&self, sample_rate: f64) -> usize {
        (sample_rate * self.duration_ms / 1000.0).round() as usize
    }

    /// Burst value `s` samples after onset.
    pub fn sample(&self, s: usize, sample_rate: f64) -> f64 {
        let t = s as f64 / sample_rate;
        (-t * self.decay).exp() * (2.0 * PI * self.freq * t).sin() * self.gain
    }

    /// Add `len` samples of the burst into `buf` starting at `onset`,
    /// truncated at the end of the buffer.
    pub fn add_into(&self, buf: &mut [f64], onset: usize, len: usize, sample_rate: f64) {
        let end = onset.saturating_add(len).min(buf.len());
        for idx in onset..end {
            buf[idx] += self.sample(idx - onset, sample_rate);
        }
    }
}

/// Pluck envelope: linear attack from 0 to 1 over `attack` samples, then
/// `exp(-t * decay)` measured from the note onset.
pub fn pluck(len: usize, attack: usize, decay: f64, sample_rate: f64) -> Vec<f64> {
    let attack = attack.min(len);
    (0..len)
        .map(|i| {
            if i < attack {
                if attack > 1 {
                    i as f64 / (attack - 1) as f64
                } else {
                    0.0
                }
            } else {
                (-(i as f64 / sample_rate) * decay).exp()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fades_zero_both_edges() {
        let mut buf = vec![1.0_f64; 100];
        apply_edge_fades(&mut buf, 10);
        assert_eq!(buf[0], 0.0);
        assert_eq!(buf[99], 0.0);
        assert!((buf[5] - 0.5).abs() < 1e-12);
        assert!((buf[94] - 0.5).abs() < 1e-12);
        assert_eq!(buf[50], 1.0);
    }

    #[test]
    fn fade_longer_than_buffer_is_safe() {
        let mut buf = vec![1.0_f64; 3];
        apply_edge_fades(&mut buf, 10);
        assert!(buf.iter().all(|&s| s.abs() <= 1.0));
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn tick_decays() {
        let tick = TickBurst {
            freq: 880.0,
            gain: 0.15,
            decay: 40.0,
            duration_ms: 40.0,
        };
        assert_eq!(tick.sample(0, 24000.0), 0.0);
        assert_eq!(tick.len_floor(24000.0), 960);
        let early: f64 = (0..100).map(|s| tick.sample(s, 24000.0).abs()).sum();
        let late: f64 = (860..960).map(|s| tick.sample(s, 24000.0).abs()).sum();
        assert!(late < early);
    }

    #[test]
    fn tick_is_truncated_at_buffer_end() {
        let tick = TickBurst {
            freq: 900.0,
            gain: 0.13,
            decay: 300.0,
            duration_ms: 18.0,
        };
        let mut buf = vec![0.0_f64; 10];
        tick.add_into(&mut buf, 5, 100, 1000.0);
        assert_eq!(buf[..5], [0.0; 5]);
        assert!(buf[6] != 0.0);
    }

    #[test]
    fn pluck_shape() {
        let env = pluck(100, 5, 3.2, 1000.0);
        assert_eq!(env[0], 0.0);
        assert_eq!(env[4], 1.0);
        assert!(env[5] < 1.0 && env[5] > env[99]);
        assert_eq!(pluck(1, 6, 3.2, 1000.0), vec![0.0]);
        assert!(pluck(0, 6, 3.2, 1000.0).is_empty());
    }
}
