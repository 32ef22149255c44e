//! `dashboard_v1`: stereo traffic / conversion clip.
//!
//! LEFT  = traffic: warm organ pad, pitch rises with volume, gentle vibrato,
//!         small room.
//! RIGHT = conversion echo: bright three-layer chorus, deeper room, arriving
//!         `lag_days` later than the traffic it follows.
//!
//! Optional day ticks on both channels let a listener count the lag.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

use crate::dsp::delay::{shift_later, steps_to_samples};
use crate::dsp::envelope::{TickBurst, pluck};
use crate::dsp::filter::lowpass;
use crate::dsp::interpolate::upsample;
use crate::dsp::mixer::{hard_clip, normalize_peak, to_f32};
use crate::dsp::oscillator::{Oscillator, Unison, Waveform};
use crate::dsp::reverb::{PLUCK_ROOM, Reverb, SPACIOUS_ROOM, WARM_ROOM};
use crate::mapping::pitch_from;
use crate::series::SeriesPoint;

use super::amplitude_for;

const PITCH_FLOOR_HZ: f64 = 80.0;
const MAX_LAG_DAYS: usize = 3;
const PEAK_TARGET: f64 = 0.8;
const RANGE_FLOOR: f64 = 1e-9;

const LEFT_CUTOFF_HZ: f64 = 1000.0;
const RIGHT_CUTOFF_HZ: f64 = 2500.0;
const VIBRATO_HZ: f64 = 5.2;
const VIBRATO_DEPTH: f64 = 0.004;
const CHORUS_DETUNE: [f64; 3] = [1.0, 1.015, 0.985];

const NOTE_FILL: f64 = 0.72;
const NOTE_ATTACK_MS: f64 = 6.0;
const LEFT_NOTE_DECAY: f64 = 3.2;
const RIGHT_NOTE_DECAY: f64 = 2.2;

const DAY_TICK: TickBurst = TickBurst {
    freq: 900.0,
    gain: 0.13,
    decay: 300.0,
    duration_ms: 18.0,
};

/// How the days are voiced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DashboardMode {
    /// One gliding tone per channel across the whole clip.
    #[default]
    Continuous,
    /// One plucked note per day; the gap between left and right is the lag.
    PerDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardOptions {
    pub duration_ms: f64,
    pub sample_rate: u32,
    /// `None` detects the lag by cross-correlation.
    #[serde(alias = "lagDays")]
    pub lag_days: Option<usize>,
    pub ticks: bool,
    pub mode: DashboardMode,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            duration_ms: 18000.0,
            sample_rate: 44100,
            lag_days: None,
            ticks: true,
            mode: DashboardMode::Continuous,
        }
    }
}

impl DashboardOptions {
    /// `round(duration / 1000 × sample_rate)`.
    pub fn total_samples(&self) -> usize {
        (self.duration_ms / 1000.0 * self.sample_rate as f64)
            .round()
            .max(0.0) as usize
    }
}

/// Per-day series for a paired visualisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub traffic: Vec<SeriesPoint>,
    pub conversion_rate: Vec<SeriesPoint>,
}

/// A rendered stereo clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardClip {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub lag_days: usize,
    /// Silent lead-in of the right channel, in samples.
    pub lag_samples: usize,
    pub chart: ChartData,
}

impl DashboardClip {
    pub fn to_wav(&self, sample_rate: u32) -> Vec<u8> {
        crate::wav::encode_stereo(&self.left, &self.right, sample_rate)
    }

    pub fn frames(&self) -> usize {
        self.left.len().max(self.right.len())
    }
}

/// `ln(1 + max(0, v))`, then min-max scaled. A flat series maps to zeros.
pub fn log_norm(values: &[f64]) -> Vec<f64> {
    let logged: Vec<f64> = values.iter().map(|v| v.max(0.0).ln_1p()).collect();
    min_max_norm(&logged)
}

/// Min-max scale to `[0, 1]` with the range floored at `1e-9`.
pub fn min_max_norm(values: &[f64]) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if hi - lo > 0.0 { hi - lo } else { RANGE_FLOOR };
    values.iter().map(|v| (v - lo) / range).collect()
}

/// Days (0..=3) by which revenue trails traffic, by mean cross-covariance of
/// the log-normalised, mean-centred series. Fewer than two days give 0.
pub fn detect_lag(traffic: &[f64], revenue: &[f64]) -> usize {
    let n = traffic.len().min(revenue.len());
    if n < 2 {
        return 0;
    }
    let centred = |values: &[f64]| {
        let normed = log_norm(&values[..n]);
        let mean = normed.iter().sum::<f64>() / n as f64;
        normed.into_iter().map(|v| v - mean).collect::<Vec<f64>>()
    };
    let t = centred(traffic);
    let r = centred(revenue);

    let mut best_lag = 0;
    let mut best_corr = f64::NEG_INFINITY;
    for lag in 0..=MAX_LAG_DAYS.min(n - 1) {
        let len = n - lag;
        let corr = (0..len).map(|i| t[i] * r[i + lag]).sum::<f64>() / len as f64;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }
    best_lag
}

/// Revenue per unit of traffic for each day.
pub fn conversion_rate(traffic: &[f64], revenue: &[f64]) -> Vec<f64> {
    traffic
        .iter()
        .zip(revenue)
        .map(|(t, r)| r / (t + RANGE_FLOOR))
        .collect()
}

/// Per-day pitch and loudness targets for one channel.
struct Voicing {
    freq: Vec<f64>,
    amp: Vec<f64>,
}

impl Voicing {
    fn from_values(values: &[f64]) -> Self {
        Voicing {
            freq: log_norm(values)
                .into_iter()
                .map(|n| pitch_from(PITCH_FLOOR_HZ, n))
                .collect(),
            amp: min_max_norm(values).into_iter().map(amplitude_for).collect(),
        }
    }
}

/// Render the stereo clip. Paired series are truncated to the shorter one.
pub fn render_dashboard(
    traffic: &[SeriesPoint],
    revenue: &[SeriesPoint],
    opts: &DashboardOptions,
) -> DashboardClip {
    let days = traffic.len().min(revenue.len());
    if days == 0 {
        return DashboardClip::default();
    }
    let traffic = &traffic[..days];
    let traffic_v: Vec<f64> = traffic.iter().map(|p| p.value).collect();
    let revenue_v: Vec<f64> = revenue[..days].iter().map(|p| p.value).collect();
    let rps = conversion_rate(&traffic_v, &revenue_v);

    let lag_days = opts
        .lag_days
        .unwrap_or_else(|| detect_lag(&traffic_v, &revenue_v));
    let sample_rate = opts.sample_rate as f64;
    let total = opts.total_samples();

    let left_voice = Voicing::from_values(&traffic_v);
    let right_voice = Voicing::from_values(&rps);

    let (mut left, mut right, lag_samples) = match opts.mode {
        DashboardMode::Continuous => {
            let left = continuous_left(&left_voice, total, sample_rate);
            let lag_samples = steps_to_samples(lag_days, days, total);
            let right = shift_later(&continuous_right(&right_voice, total, sample_rate), lag_samples);
            (left, right, lag_samples)
        }
        DashboardMode::PerDay => per_day(&left_voice, &right_voice, lag_days, total, sample_rate),
    };

    normalize_peak(&mut left, PEAK_TARGET);
    normalize_peak(&mut right, PEAK_TARGET);

    if opts.ticks {
        add_day_ticks(&mut left, &mut right, days, sample_rate);
    }

    hard_clip(&mut left);
    hard_clip(&mut right);

    debug!(
        days,
        lag_days,
        lag_samples,
        samples = total,
        mode = ?opts.mode,
        "rendered dashboard clip"
    );

    DashboardClip {
        left: to_f32(&left),
        right: to_f32(&right),
        lag_days,
        lag_samples,
        chart: ChartData {
            traffic: traffic.to_vec(),
            conversion_rate: traffic
                .iter()
                .zip(&rps)
                .map(|(p, &v)| SeriesPoint::new(p.timestamp.clone(), v))
                .collect(),
        },
    }
}

/// Spline-smoothed per-sample curve, clamped at zero against overshoot.
fn smooth(per_day: &[f64], total: usize) -> Vec<f64> {
    upsample(per_day, total)
        .into_iter()
        .map(|v| v.max(0.0))
        .collect()
}

fn continuous_left(voice: &Voicing, total: usize, sample_rate: f64) -> Vec<f64> {
    let freq = smooth(&voice.freq, total);
    let amp = smooth(&voice.amp, total);
    let mut organ = Oscillator::new(Waveform::Organ, sample_rate);

    let raw: Vec<f64> = (0..total)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let vibrato = 1.0 + VIBRATO_DEPTH * (2.0 * PI * VIBRATO_HZ * t).sin();
            organ.next_sample(freq[i] * vibrato) * amp[i]
        })
        .collect();

    let filtered = lowpass(&raw, LEFT_CUTOFF_HZ, sample_rate);
    Reverb::new(sample_rate, &WARM_ROOM).process(&filtered)
}

fn continuous_right(voice: &Voicing, total: usize, sample_rate: f64) -> Vec<f64> {
    let freq = smooth(&voice.freq, total);
    let amp = smooth(&voice.amp, total);
    let mut chorus = Unison::new(Waveform::Bright, sample_rate, &CHORUS_DETUNE);

    let raw: Vec<f64> = (0..total)
        .map(|i| chorus.next_sample(freq[i]) * amp[i])
        .collect();

    let filtered = lowpass(&raw, RIGHT_CUTOFF_HZ, sample_rate);
    Reverb::new(sample_rate, &SPACIOUS_ROOM).process(&filtered)
}

/// One plucked note per day on each channel; the right note for day `d`
/// lands in slot `d + lag` and is dropped past the last day.
fn per_day(
    left_voice: &Voicing,
    right_voice: &Voicing,
    lag_days: usize,
    total: usize,
    sample_rate: f64,
) -> (Vec<f64>, Vec<f64>, usize) {
    let days = left_voice.freq.len();
    let per_day = total as f64 / days as f64;
    let slot_start = |d: usize| ((d as f64 * per_day).floor() as usize).min(total);
    let note_len = (per_day * NOTE_FILL).floor() as usize;
    let attack = (sample_rate * NOTE_ATTACK_MS / 1000.0).floor() as usize;
    let echo = Reverb::new(sample_rate, &PLUCK_ROOM);

    let mut left = vec![0.0; total];
    let mut right = vec![0.0; total];

    for day in 0..days {
        let onset = slot_start(day);
        let end = (onset + note_len).min(total);
        let env = pluck(end - onset, attack, LEFT_NOTE_DECAY, sample_rate);
        let mut organ = Oscillator::new(Waveform::Organ, sample_rate);
        let note: Vec<f64> = env
            .iter()
            .map(|e| organ.next_sample(left_voice.freq[day]) * left_voice.amp[day] * e)
            .collect();
        for (out, s) in left[onset..end].iter_mut().zip(lowpass(&note, LEFT_CUTOFF_HZ, sample_rate)) {
            *out += s;
        }

        let Some(echo_day) = day.checked_add(lag_days).filter(|&d| d < days) else {
            continue;
        };
        let onset = slot_start(echo_day);
        let end = (onset + note_len).min(total);
        let env = pluck(end - onset, attack, RIGHT_NOTE_DECAY, sample_rate);
        let mut chorus = Unison::new(Waveform::Bright, sample_rate, &CHORUS_DETUNE);
        let note: Vec<f64> = env
            .iter()
            .map(|e| chorus.next_sample(right_voice.freq[day]) * right_voice.amp[day] * e)
            .collect();
        let wet = echo.process(&lowpass(&note, RIGHT_CUTOFF_HZ, sample_rate));
        for (out, s) in right[onset..end].iter_mut().zip(wet) {
            *out += s;
        }
    }

    (left, right, slot_start(lag_days.min(days)))
}

/// Woodblock click at every day boundary on both channels.
fn add_day_ticks(left: &mut [f64], right: &mut [f64], days: usize, sample_rate: f64) {
    let len = DAY_TICK.len_round(sample_rate);
    let per_day = left.len() as f64 / days as f64;
    for day in 0..days {
        let onset = (day as f64 * per_day).round() as usize;
        DAY_TICK.add_into(left, onset, len, sample_rate);
        DAY_TICK.add_into(right, onset, len, sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(values: &[f64]) -> Vec<SeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesPoint::new(format!("2024-05-{:02}", i + 1), v))
            .collect()
    }

    fn spiky_traffic() -> Vec<f64> {
        vec![
            120.0, 130.0, 480.0, 125.0, 118.0, 140.0, 135.0, 900.0, 128.0, 122.0, 131.0, 126.0,
            610.0, 119.0, 133.0, 127.0,
        ]
    }

    /// Revenue that mirrors traffic `lag` days later.
    fn trailing(traffic: &[f64], lag: usize) -> Vec<f64> {
        (0..traffic.len())
            .map(|i| if i >= lag { traffic[i - lag] * 3.5 } else { traffic[0] * 3.5 })
            .collect()
    }

    fn small_opts() -> DashboardOptions {
        DashboardOptions {
            duration_ms: 1600.0,
            sample_rate: 8000,
            ticks: false,
            ..DashboardOptions::default()
        }
    }

    #[test]
    fn detects_known_lag() {
        let traffic = spiky_traffic();
        for lag in 0..=3 {
            assert_eq!(detect_lag(&traffic, &trailing(&traffic, lag)), lag, "lag {lag}");
        }
    }

    #[test]
    fn lag_is_in_range() {
        let traffic = [5.0, 1.0, 9.0, 2.0, 7.0, 3.0, 8.0];
        let revenue = [2.0, 8.0, 1.0, 6.0, 4.0, 9.0, 2.0];
        assert!(detect_lag(&traffic, &revenue) <= 3);
    }

    #[test]
    fn lag_degenerates_to_zero() {
        assert_eq!(detect_lag(&[], &[]), 0);
        assert_eq!(detect_lag(&[4.0], &[9.0]), 0);
        // Two days only allow lag 0 or 1.
        assert!(detect_lag(&[1.0, 5.0], &[5.0, 1.0]) <= 1);
    }

    #[test]
    fn log_norm_handles_flat_and_negative() {
        assert_eq!(log_norm(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);
        let n = log_norm(&[-5.0, 0.0, (1.0_f64).exp() - 1.0]);
        assert_eq!(n[0], 0.0);
        assert_eq!(n[1], 0.0);
        assert!((n[2] - 1.0).abs() < 1e-9);
        assert!(log_norm(&[]).is_empty());
    }

    #[test]
    fn sample_count_rounds_duration() {
        let traffic = days(&spiky_traffic());
        let clip = render_dashboard(&traffic, &traffic, &small_opts());
        assert_eq!(clip.left.len(), 12800);
        assert_eq!(clip.right.len(), 12800);
        assert_eq!(DashboardOptions::default().total_samples(), 793800);
    }

    #[test]
    fn right_channel_silent_until_echo_arrives() {
        let traffic = spiky_traffic();
        let opts = DashboardOptions {
            lag_days: Some(2),
            ..small_opts()
        };
        let clip = render_dashboard(&days(&traffic), &days(&trailing(&traffic, 2)), &opts);
        assert_eq!(clip.lag_days, 2);
        assert_eq!(clip.lag_samples, 1600);
        assert!(clip.right[..clip.lag_samples].iter().all(|&s| s == 0.0));
        assert!(clip.right[clip.lag_samples..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn channels_peak_at_target() {
        let traffic = spiky_traffic();
        let clip = render_dashboard(&days(&traffic), &days(&trailing(&traffic, 1)), &small_opts());
        for channel in [&clip.left, &clip.right] {
            let peak = channel.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
            assert!((peak - 0.8).abs() < 1e-5, "peak {peak}");
        }
    }

    #[test]
    fn ticks_mark_day_boundaries() {
        let traffic = days(&spiky_traffic());
        let plain = render_dashboard(&traffic, &traffic, &small_opts());
        let ticked = render_dashboard(
            &traffic,
            &traffic,
            &DashboardOptions {
                ticks: true,
                ..small_opts()
            },
        );
        // Day 1 starts at sample 800; the tick's second sample is non-zero.
        assert_ne!(plain.left[801], ticked.left[801]);
        assert_ne!(plain.right[801], ticked.right[801]);
        assert!(ticked.left.iter().chain(&ticked.right).all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn chart_carries_conversion_rate() {
        let clip = render_dashboard(
            &days(&[100.0, 200.0]),
            &days(&[50.0, 20.0]),
            &small_opts(),
        );
        assert_eq!(clip.chart.traffic.len(), 2);
        assert_eq!(clip.chart.conversion_rate[0].timestamp, "2024-05-01");
        assert!((clip.chart.conversion_rate[0].value - 0.5).abs() < 1e-9);
        assert!((clip.chart.conversion_rate[1].value - 0.1).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_truncate() {
        let clip = render_dashboard(
            &days(&spiky_traffic()),
            &days(&[10.0, 20.0, 30.0, 40.0, 50.0]),
            &small_opts(),
        );
        assert_eq!(clip.chart.traffic.len(), 5);
        assert_eq!(clip.chart.conversion_rate.len(), 5);
        assert!(clip.lag_days <= 3);
    }

    #[test]
    fn empty_input_is_empty_clip() {
        let clip = render_dashboard(&[], &days(&[1.0]), &small_opts());
        assert_eq!(clip, DashboardClip::default());
        assert_eq!(clip.frames(), 0);
    }

    #[test]
    fn per_day_notes_follow_slots() {
        let traffic = spiky_traffic();
        let opts = DashboardOptions {
            mode: DashboardMode::PerDay,
            lag_days: Some(3),
            ..small_opts()
        };
        let clip = render_dashboard(&days(&traffic), &days(&trailing(&traffic, 3)), &opts);
        assert_eq!(clip.left.len(), 12800);
        assert_eq!(clip.lag_samples, 2400);
        assert!(clip.right[..2400].iter().all(|&s| s == 0.0));
        assert!(clip.right[2400..].iter().any(|&s| s != 0.0));

        // The last 28% of each slot is a gap on the left channel.
        let gap = &clip.left[576..800];
        assert!(gap.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn per_day_echo_beyond_last_day_is_dropped() {
        let opts = DashboardOptions {
            mode: DashboardMode::PerDay,
            lag_days: Some(5),
            ..small_opts()
        };
        let clip = render_dashboard(&days(&[1.0, 2.0, 3.0]), &days(&[1.0, 2.0, 3.0]), &opts);
        assert!(clip.right.iter().all(|&s| s == 0.0));
        assert_eq!(clip.lag_samples, 12800);
    }

    #[test]
    fn per_day_tolerates_an_enormous_lag() {
        let opts = DashboardOptions {
            mode: DashboardMode::PerDay,
            lag_days: Some(usize::MAX),
            ..small_opts()
        };
        let clip = render_dashboard(&days(&[4.0, 9.0, 2.0]), &days(&[1.0, 3.0, 2.0]), &opts);
        assert_eq!(clip.lag_days, usize::MAX);
        assert_eq!(clip.lag_samples, 12800);
        assert!(clip.right.iter().all(|&s| s == 0.0));
        assert!(clip.left.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn stereo_wav_has_two_channels() {
        let traffic = days(&[1.0, 3.0, 2.0]);
        let clip = render_dashboard(&traffic, &traffic, &small_opts());
        let wav = clip.to_wav(8000);
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(wav.len(), 44 + clip.frames() * 4);
    }

    #[test]
    fn options_accept_partial_json() {
        let opts: DashboardOptions =
            serde_json::from_str(r#"{"lagDays": 2, "mode": "per-day"}"#).unwrap();
        assert_eq!(opts.lag_days, Some(2));
        assert_eq!(opts.mode, DashboardMode::PerDay);
        assert!(opts.ticks);
        assert_eq!(opts.sample_rate, 44100);
    }
}
