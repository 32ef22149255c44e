//! `compare_v1`: two series played back to back.
//!
//! Series A fills the first phrase, a 60 ms silent gap follows, then series B
//! fills the second phrase. Both are normalised together so equal values get
//! equal pitch. Each phrase fades in and out over 30 ms on its own.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::envelope::apply_edge_fades;
use crate::dsp::mixer::to_f32;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::mapping::{NormalizeMethod, norm_to_freq, normalize_values};
use crate::series::{CompareSeries, values_of};

use super::amplitude_for;

const FADE_MS: f64 = 30.0;
const GAP_MS: f64 = 60.0;

/// Options for [`render_compare`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Total clip length: both phrases plus the gap.
    pub duration_ms: f64,
    pub sample_rate: u32,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            duration_ms: 3200.0,
            sample_rate: 24000,
        }
    }
}

/// A rendered A/B clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareClip {
    pub samples: Vec<f32>,
    /// Where each phrase starts, in samples.
    pub phrase_offsets: [usize; 2],
    pub phrase_samples: usize,
    /// Listener-facing sentence naming which phrase is which series.
    pub explain_hint: String,
}

impl CompareClip {
    pub fn to_wav(&self, sample_rate: u32) -> Vec<u8> {
        crate::wav::encode_mono(&self.samples, sample_rate)
    }
}

/// Explanation shown next to a compare clip.
pub fn explain_hint(a: &CompareSeries, b: &CompareSeries) -> String {
    format!(
        "First phrase is {}, second phrase is {}. Higher notes mean larger values.",
        a.label, b.label
    )
}

/// Render the A/B clip.
pub fn render_compare(a: &CompareSeries, b: &CompareSeries, opts: &CompareOptions) -> CompareClip {
    let sample_rate = opts.sample_rate as f64;
    let gap = (sample_rate * GAP_MS / 1000.0).floor() as usize;
    let half = ((sample_rate * opts.duration_ms / 1000.0 - gap as f64) / 2.0)
        .floor()
        .max(0.0) as usize;
    let total = half * 2 + gap;
    let mut samples = vec![0.0_f64; total];

    let mut all = values_of(&a.points);
    all.extend(values_of(&b.points));
    let normalized = normalize_values(&all, NormalizeMethod::MinMax);
    let (norm_a, norm_b) = normalized.split_at(a.points.len());

    let fade = (sample_rate * FADE_MS / 1000.0).floor() as usize;
    let offsets = [0, half + gap];
    for (offset, norms) in offsets.into_iter().zip([norm_a, norm_b]) {
        let phrase = &mut samples[offset..offset + half];
        render_phrase(phrase, norms, sample_rate);
        apply_edge_fades(phrase, fade);
    }

    debug!(
        a = %a.label,
        b = %b.label,
        samples = total,
        "rendered compare clip"
    );

    CompareClip {
        samples: to_f32(&samples),
        phrase_offsets: offsets,
        phrase_samples: half,
        explain_hint: explain_hint(a, b),
    }
}

/// Fill one phrase: equal slices per point, phase carried across slices.
fn render_phrase(out: &mut [f64], normalized: &[f64], sample_rate: f64) {
    let len = out.len();
    let per_point = len as f64 / normalized.len().max(1) as f64;
    let mut osc = Oscillator::new(Waveform::Triangle, sample_rate);

    for (i, &norm) in normalized.iter().enumerate() {
        let start = ((i as f64 * per_point).floor() as usize).min(len);
        let end = (((i + 1) as f64 * per_point).floor() as usize).min(len);
        let freq = norm_to_freq(norm);
        let amp = amplitude_for(norm);
        for s in &mut out[start..end.max(start)] {
            *s = amp * osc.next_sample(freq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesPoint;

    fn labelled(label: &str, values: &[f64]) -> CompareSeries {
        CompareSeries {
            label: label.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint::new(format!("d{i}"), v))
                .collect(),
        }
    }

    #[test]
    fn layout_is_two_halves_and_a_gap() {
        let clip = render_compare(
            &labelled("this_week", &[1.0, 2.0, 3.0]),
            &labelled("last_week", &[3.0, 2.0, 1.0]),
            &CompareOptions::default(),
        );
        // 3200 ms @ 24 kHz = 76800; gap = 1440; halves = 37680.
        assert_eq!(clip.phrase_samples, 37680);
        assert_eq!(clip.samples.len(), 37680 * 2 + 1440);
        assert_eq!(clip.phrase_offsets, [0, 37680 + 1440]);
    }

    #[test]
    fn gap_is_silent() {
        let clip = render_compare(
            &labelled("a", &[5.0, 6.0]),
            &labelled("b", &[7.0, 8.0]),
            &CompareOptions::default(),
        );
        let gap = &clip.samples[clip.phrase_samples..clip.phrase_offsets[1]];
        assert!(gap.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn each_phrase_fades_independently() {
        let clip = render_compare(
            &labelled("a", &[5.0, 6.0]),
            &labelled("b", &[7.0, 8.0]),
            &CompareOptions::default(),
        );
        let half = clip.phrase_samples;
        let b0 = clip.phrase_offsets[1];
        assert_eq!(clip.samples[0], 0.0);
        assert_eq!(clip.samples[half - 1], 0.0);
        assert_eq!(clip.samples[b0], 0.0);
        assert_eq!(clip.samples[b0 + half - 1], 0.0);
    }

    #[test]
    fn shared_normalisation_keeps_pitch_comparable() {
        // Same values in both series must render identical phrases.
        let a = labelled("a", &[10.0, 40.0, 20.0]);
        let b = labelled("b", &[10.0, 40.0, 20.0]);
        let clip = render_compare(&a, &b, &CompareOptions::default());
        let half = clip.phrase_samples;
        let b0 = clip.phrase_offsets[1];
        assert_eq!(&clip.samples[..half], &clip.samples[b0..b0 + half]);

        // A louder-valued B gets higher amplitude than a quiet A.
        let quiet = labelled("quiet", &[1.0, 1.0]);
        let loud = labelled("loud", &[100.0, 100.0]);
        let clip = render_compare(&quiet, &loud, &CompareOptions::default());
        let peak = |s: &[f32]| s.iter().fold(0.0_f32, |m, &x| m.max(x.abs()));
        let b0 = clip.phrase_offsets[1];
        assert!(peak(&clip.samples[b0..]) > peak(&clip.samples[..clip.phrase_samples]));
    }

    #[test]
    fn hint_names_both_series() {
        let clip = render_compare(
            &labelled("this_week", &[1.0]),
            &labelled("last_week", &[2.0]),
            &CompareOptions::default(),
        );
        assert_eq!(
            clip.explain_hint,
            "First phrase is this_week, second phrase is last_week. Higher notes mean larger values."
        );
    }

    #[test]
    fn tiny_duration_does_not_panic() {
        let clip = render_compare(
            &labelled("a", &[1.0]),
            &labelled("b", &[2.0]),
            &CompareOptions {
                duration_ms: 10.0,
                sample_rate: 24000,
            },
        );
        assert_eq!(clip.phrase_samples, 0);
        assert!(clip.samples.iter().all(|&s| s == 0.0));
    }
}
