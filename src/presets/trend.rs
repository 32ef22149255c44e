//! `trend_v1`: single time-series clip.
//!
//! Mapping:
//!  - Each point occupies an equal slice of the clip.
//!  - Pitch  = `norm_to_freq(normalised value)`.
//!  - Volume = `0.25 + 0.55 × normalised value`.
//!  - Timbre = triangle; phase carries across slices, so pitch glides.
//!  - Events = `|z| ≥ 2` on the raw values marks a spike/dip and overlays a
//!    decaying 880 Hz burst at that point.
//!  - 20 ms linear fades at both ends.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::envelope::{TickBurst, apply_edge_fades};
use crate::dsp::mixer::to_f32;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::mapping::{NormalizeMethod, mean_and_sigma, norm_to_freq, normalize_values};
use crate::series::{EventKind, SeriesPoint, SonifyEvent, values_of};

use super::{MonoClip, amplitude_for};

const FADE_MS: f64 = 20.0;
const Z_SPIKE: f64 = 2.0;
const MIN_SPEED: f64 = 0.1;

const EVENT_TICK: TickBurst = TickBurst {
    freq: 880.0,
    gain: 0.15,
    decay: 40.0,
    duration_ms: 40.0,
};

/// Options for [`render_trend`]. Missing JSON fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendOptions {
    pub duration_ms: f64,
    pub sample_rate: u32,
    pub normalize: NormalizeMethod,
    /// Duration divisor: `speed = 2` renders a clip half as long.
    pub speed: f64,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            duration_ms: 2800.0,
            sample_rate: 24000,
            normalize: NormalizeMethod::MinMax,
            speed: 1.0,
        }
    }
}

impl TrendOptions {
    /// Clip length after applying `speed` (floored at 0.1).
    pub fn effective_duration_ms(&self) -> f64 {
        self.duration_ms / self.speed.max(MIN_SPEED)
    }

    /// `floor(sample_rate × effective_duration / 1000)`, at least one sample.
    pub fn total_samples(&self) -> usize {
        let n = (self.sample_rate as f64 * self.effective_duration_ms() / 1000.0).floor();
        (n.max(1.0)) as usize
    }
}

/// Spike/dip markers for points whose raw z-score reaches ±2.
///
/// Fewer than two points can never stand out, so they report nothing.
pub fn detect_events(points: &[SeriesPoint]) -> Vec<(usize, SonifyEvent)> {
    if points.len() < 2 {
        return Vec::new();
    }
    let values = values_of(points);
    let (mean, sigma) = mean_and_sigma(&values);

    values
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| {
            let z = (v - mean) / sigma;
            (z.abs() >= Z_SPIKE).then(|| {
                let event = SonifyEvent {
                    t: points[i].timestamp.clone(),
                    kind: if z > 0.0 { EventKind::Spike } else { EventKind::Dip },
                    strength: (z.abs() / 4.0).min(1.0),
                };
                (i, event)
            })
        })
        .collect()
}

/// Render a trend clip. Empty input yields an empty clip.
pub fn render_trend(points: &[SeriesPoint], opts: &TrendOptions) -> MonoClip {
    if points.is_empty() {
        return MonoClip::default();
    }

    let sample_rate = opts.sample_rate as f64;
    let total = opts.total_samples();
    let mut samples = vec![0.0_f64; total];

    let normalized = normalize_values(&values_of(points), opts.normalize);
    let samples_per_point = total as f64 / points.len() as f64;
    let slice_start = |i: usize| (i as f64 * samples_per_point).floor() as usize;

    let detected = detect_events(points);
    let tick_len = EVENT_TICK.len_floor(sample_rate);

    let mut osc = Oscillator::new(Waveform::Triangle, sample_rate);
    for (i, &norm) in normalized.iter().enumerate() {
        let freq = norm_to_freq(norm);
        let amp = amplitude_for(norm);
        let end = slice_start(i + 1).min(total);
        let start = slice_start(i).min(end);
        for s in &mut samples[start..end] {
            *s = amp * osc.next_sample(freq);
        }
        // Anything spilling past `end` is overwritten by the next slice's tone.
        if detected.iter().any(|(at, _)| *at == i) {
            EVENT_TICK.add_into(&mut samples, start, tick_len, sample_rate);
        }
    }

    apply_edge_fades(&mut samples, (sample_rate * FADE_MS / 1000.0).floor() as usize);

    let events: Vec<SonifyEvent> = detected.into_iter().map(|(_, e)| e).collect();
    debug!(
        points = points.len(),
        samples = total,
        events = events.len(),
        "rendered trend clip"
    );

    MonoClip {
        samples: to_f32(&samples),
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(format!("2024-03-{:02}", i + 1), v))
            .collect()
    }

    #[test]
    fn sample_count_follows_duration() {
        let opts = TrendOptions::default();
        let clip = render_trend(&series(&[1.0, 2.0, 3.0]), &opts);
        assert_eq!(clip.samples.len(), 67200);
        assert_eq!(clip.samples.len(), opts.total_samples());
    }

    #[test]
    fn doubling_speed_halves_length() {
        let points = series(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        let slow = render_trend(&points, &TrendOptions::default());
        let fast = render_trend(
            &points,
            &TrendOptions {
                speed: 2.0,
                ..TrendOptions::default()
            },
        );
        assert_eq!(fast.samples.len() * 2, slow.samples.len());
    }

    #[test]
    fn speed_is_floored() {
        let opts = TrendOptions {
            duration_ms: 100.0,
            sample_rate: 1000,
            speed: 0.0,
            ..TrendOptions::default()
        };
        assert_eq!(opts.total_samples(), 1000);
    }

    #[test]
    fn outlier_produces_spike_event() {
        let points = series(&[100.0, 100.0, 100.0, 100.0, 100.0, 900.0]);
        let clip = render_trend(&points, &TrendOptions::default());
        let spikes: Vec<_> = clip
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Spike)
            .collect();
        assert!(!spikes.is_empty());
        assert_eq!(spikes[0].t, "2024-03-06");
        assert!((0.0..=1.0).contains(&spikes[0].strength));
    }

    #[test]
    fn low_outlier_is_a_dip() {
        let points = series(&[50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 0.0]);
        let events = detect_events(&points);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, 7);
        assert_eq!(events[0].1.kind, EventKind::Dip);
    }

    #[test]
    fn burst_on_a_short_slice_leaves_the_next_slice_pure() {
        // 100 points over 2800 ms: 672-sample slices against a 960-sample burst.
        let mut values = vec![100.0; 100];
        values[50] = 900.0;
        let clip = render_trend(&series(&values), &TrendOptions::default());
        assert_eq!(clip.events.len(), 1);

        let next = &clip.samples[51 * 672..52 * 672];
        assert!(next.iter().all(|s| s.abs() <= 0.25));
        assert!(next.iter().any(|s| s.abs() > 0.2));
    }

    #[test]
    fn flat_series_has_no_events() {
        let clip = render_trend(&series(&[7.0; 12]), &TrendOptions::default());
        assert!(clip.events.is_empty());
    }

    #[test]
    fn starts_faded_in() {
        let clip = render_trend(&series(&[10.0, 80.0, 30.0]), &TrendOptions::default());
        assert!(clip.samples[0].abs() < 1e-6);
        assert!(clip.samples.last().unwrap().abs() < 1e-6);
    }

    #[test]
    fn output_is_bounded() {
        let clip = render_trend(
            &series(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0]),
            &TrendOptions::default(),
        );
        assert!(clip.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn empty_input_is_empty_clip() {
        let clip = render_trend(&[], &TrendOptions::default());
        assert!(clip.samples.is_empty());
        assert!(clip.events.is_empty());
    }

    #[test]
    fn deterministic() {
        let points = series(&[5.0, 9.0, 2.0, 6.0]);
        let a = render_trend(&points, &TrendOptions::default());
        let b = render_trend(&points, &TrendOptions::default());
        assert_eq!(a, b);
    }

    #[test]
    fn options_merge_partial_json() {
        let opts: TrendOptions = serde_json::from_str(r#"{"speed": 2, "normalize": "zscore"}"#).unwrap();
        assert_eq!(opts.speed, 2.0);
        assert_eq!(opts.normalize, NormalizeMethod::ZScore);
        assert_eq!(opts.sample_rate, 24000);
        assert_eq!(opts.duration_ms, 2800.0);
    }
}
