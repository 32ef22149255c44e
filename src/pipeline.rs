//! Request-level rendering: validate, pick a preset, render, encode, describe.
//!
//! Request and response types keep the HTTP wire names (`duration_ms`,
//! `sample_rate`, `explain_hint`, `lagDays`, `chart_data`) so the same JSON
//! can be fed to the CLI, the WASM exports, or a server handler.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SonifyError;
use crate::mapping::NormalizeMethod;
use crate::presets::compare::{CompareOptions, render_compare};
use crate::presets::dashboard::{ChartData, DashboardOptions, render_dashboard};
use crate::presets::trend::{TrendOptions, render_trend};
use crate::series::{CompareSeries, SeriesPoint, SonifyEvent, first_non_finite};
use crate::wav;

pub const TREND_PRESET: &str = "trend_v1";
pub const COMPARE_PRESET: &str = "compare_v1";
pub const DASHBOARD_PRESET: &str = "dashboard_v1";

/// Longest clip a request may ask for: ten minutes at 48 kHz.
pub const MAX_CLIP_FRAMES: usize = 48_000 * 600;

// ── Requests ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    /// e.g. `revenue`, `orders`, `aov`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// e.g. `hour`, `day`, `week`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    pub preset: Option<String>,
    pub duration_ms: Option<f64>,
    pub speed: Option<f64>,
    pub normalize: Option<NormalizeMethod>,
    /// Label of the source range; carried through, not interpreted.
    pub range_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonifySeriesRequest {
    pub series: SeriesDescriptor,
    #[serde(default)]
    pub mapping: MappingOptions,
    #[serde(default)]
    pub render: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonifyCompareRequest {
    pub a: CompareSeries,
    pub b: CompareSeries,
    #[serde(default)]
    pub mapping: MappingOptions,
    #[serde(default)]
    pub render: RenderOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub traffic: Vec<SeriesPoint>,
    pub revenue: Vec<SeriesPoint>,
    #[serde(default)]
    pub options: DashboardOptions,
}

// ── Responses ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMeta {
    pub duration_ms: u64,
    pub events: Vec<SonifyEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareMeta {
    pub duration_ms: u64,
    pub explain_hint: String,
}

/// Encoded audio plus its metadata. `wav` is not part of the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedClip<M> {
    #[serde(skip)]
    pub wav: Vec<u8>,
    pub meta: M,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardResponse {
    #[serde(skip)]
    pub wav: Vec<u8>,
    #[serde(rename = "lagDays")]
    pub lag_days: usize,
    pub duration_ms: u64,
    pub chart_data: ChartData,
}

// ── Validation ──────────────────────────────────────────────

fn check_points(label: &str, points: &[SeriesPoint]) -> Result<(), SonifyError> {
    if points.is_empty() {
        return Err(SonifyError::EmptySeries {
            label: label.to_string(),
        });
    }
    if let Some(index) = first_non_finite(points) {
        return Err(SonifyError::NonFiniteValue {
            label: label.to_string(),
            index,
        });
    }
    Ok(())
}

fn check_sample_rate(sample_rate: u32) -> Result<u32, SonifyError> {
    if sample_rate == 0 {
        Err(SonifyError::ZeroSampleRate)
    } else {
        Ok(sample_rate)
    }
}

fn check_duration(duration_ms: f64) -> Result<f64, SonifyError> {
    if duration_ms.is_finite() && duration_ms > 0.0 {
        Ok(duration_ms)
    } else {
        Err(SonifyError::InvalidDuration(duration_ms))
    }
}

fn check_speed(speed: f64) -> Result<f64, SonifyError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(SonifyError::InvalidSpeed(speed))
    }
}

fn check_frames(duration_ms: f64, sample_rate: u32) -> Result<(), SonifyError> {
    let frames = duration_ms / 1000.0 * sample_rate as f64;
    if frames > MAX_CLIP_FRAMES as f64 {
        return Err(SonifyError::ClipTooLong {
            duration_ms,
            sample_rate,
            max_frames: MAX_CLIP_FRAMES,
        });
    }
    Ok(())
}

// ── Rendering ───────────────────────────────────────────────

/// Render a single-series `trend_v1` clip.
pub fn render_series_clip(
    request: &SonifySeriesRequest,
) -> Result<RenderedClip<SeriesMeta>, SonifyError> {
    let label = request.series.metric.as_deref().unwrap_or("series");
    check_points(label, &request.series.points)?;

    let preset = request.mapping.preset.as_deref().unwrap_or(TREND_PRESET);
    if preset != TREND_PRESET {
        return Err(SonifyError::UnknownPreset(preset.to_string()));
    }

    let defaults = TrendOptions::default();
    let opts = TrendOptions {
        duration_ms: check_duration(request.mapping.duration_ms.unwrap_or(defaults.duration_ms))?,
        sample_rate: check_sample_rate(request.render.sample_rate.unwrap_or(defaults.sample_rate))?,
        normalize: request.mapping.normalize.unwrap_or(defaults.normalize),
        speed: check_speed(request.mapping.speed.unwrap_or(defaults.speed))?,
    };
    check_frames(opts.effective_duration_ms(), opts.sample_rate)?;

    let clip = render_trend(&request.series.points, &opts);
    let duration_ms = wav::duration_ms(clip.samples.len(), opts.sample_rate);
    debug!(label, duration_ms, events = clip.events.len(), "series clip ready");

    Ok(RenderedClip {
        wav: clip.to_wav(opts.sample_rate),
        meta: SeriesMeta {
            duration_ms,
            events: clip.events,
        },
    })
}

/// Render an A/B `compare_v1` clip.
pub fn render_compare_clip(
    request: &SonifyCompareRequest,
) -> Result<RenderedClip<CompareMeta>, SonifyError> {
    check_points(&request.a.label, &request.a.points)?;
    check_points(&request.b.label, &request.b.points)?;

    let defaults = CompareOptions::default();
    let opts = CompareOptions {
        duration_ms: check_duration(request.mapping.duration_ms.unwrap_or(defaults.duration_ms))?,
        sample_rate: check_sample_rate(request.render.sample_rate.unwrap_or(defaults.sample_rate))?,
    };
    check_frames(opts.duration_ms, opts.sample_rate)?;

    let clip = render_compare(&request.a, &request.b, &opts);
    let duration_ms = wav::duration_ms(clip.samples.len(), opts.sample_rate);
    debug!(a = %request.a.label, b = %request.b.label, duration_ms, "compare clip ready");

    Ok(RenderedClip {
        wav: clip.to_wav(opts.sample_rate),
        meta: CompareMeta {
            duration_ms,
            explain_hint: clip.explain_hint,
        },
    })
}

/// Render the stereo `dashboard_v1` clip.
pub fn render_dashboard_clip(request: &DashboardRequest) -> Result<DashboardResponse, SonifyError> {
    check_points("traffic", &request.traffic)?;
    check_points("revenue", &request.revenue)?;
    let sample_rate = check_sample_rate(request.options.sample_rate)?;
    check_frames(check_duration(request.options.duration_ms)?, sample_rate)?;

    let clip = render_dashboard(&request.traffic, &request.revenue, &request.options);
    let duration_ms = wav::duration_ms(clip.frames(), sample_rate);
    debug!(lag_days = clip.lag_days, duration_ms, "dashboard clip ready");

    Ok(DashboardResponse {
        wav: clip.to_wav(sample_rate),
        lag_days: clip.lag_days,
        duration_ms,
        chart_data: clip.chart,
    })
}

/// Decode a JSON request for `preset`, render it, and return the WAV bytes
/// with the JSON metadata that accompanies them on the wire.
pub fn render_request_json(
    preset: &str,
    request: &str,
) -> Result<(Vec<u8>, serde_json::Value), SonifyError> {
    match preset {
        TREND_PRESET => {
            let request: SonifySeriesRequest = serde_json::from_str(request)?;
            let clip = render_series_clip(&request)?;
            Ok((clip.wav, serde_json::to_value(&clip.meta)?))
        }
        COMPARE_PRESET => {
            let request: SonifyCompareRequest = serde_json::from_str(request)?;
            let clip = render_compare_clip(&request)?;
            Ok((clip.wav, serde_json::to_value(&clip.meta)?))
        }
        DASHBOARD_PRESET => {
            let request: DashboardRequest = serde_json::from_str(request)?;
            let response = render_dashboard_clip(&request)?;
            let meta = serde_json::to_value(&response)?;
            Ok((response.wav, meta))
        }
        other => Err(SonifyError::UnknownPreset(other.to_string())),
    }
}
