//! Realtime engine configuration, layer toggles and render mode.

use serde::{Deserialize, Serialize};

use crate::mapping::{BASE_FREQUENCY, MASTER_GAIN, OSC_GAIN};
use crate::plan::AudioPlan;

/// One-shot percussive tick fired on regime shifts or plan markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTickConfig {
    pub frequency: f64,
    pub peak_gain: f64,
    pub attack_s: f64,
    /// Gain is back at zero this long after onset.
    pub release_s: f64,
    /// Oscillator stops this long after onset.
    pub stop_s: f64,
}

impl Default for EventTickConfig {
    fn default() -> Self {
        EventTickConfig {
            frequency: 880.0,
            peak_gain: 0.05,
            attack_s: 0.006,
            release_s: 0.08,
            stop_s: 0.09,
        }
    }
}

/// Every tunable constant of the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_frequency: f64,
    pub master_gain: f64,
    pub voice_gain: f64,
    /// Master fade on start, pause and resume.
    pub attack_s: f64,
    /// Master fade on stop.
    pub release_s: f64,
    /// Harmony-voice glide on a chord change during playback.
    pub glide_s: f64,
    /// Frequency glide and master ramp after a seek.
    pub seek_ramp_s: f64,
    /// Voice gain and echo ramps in the layer mix.
    pub mix_ramp_s: f64,
    /// Master fade when playback runs off the end of the selection.
    pub finish_ramp_s: f64,
    /// Minimum steps between deterministic chord re-evaluations.
    pub eval_interval_steps: u32,
    /// Steps a new chord is held before it may change again.
    pub hold_steps: u32,
    pub seek_throttle_ms: u64,
    /// Re-check interval while the host reports a drag or scrub.
    pub drag_poll_ms: u64,
    /// Delay between the stop fade and releasing the graph.
    pub teardown_delay_ms: u64,
    /// Upper bound of the echo delay, and the delay line capacity.
    pub max_echo_s: f64,
    /// Echo per step of lag when following analytics.
    pub lag_echo_per_step_s: f64,
    pub lag_echo_max_s: f64,
    /// Smallest |lag| (in steps) that turns the echo on.
    pub lag_echo_min_steps: f64,
    pub event_tick: EventTickConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_frequency: BASE_FREQUENCY,
            master_gain: MASTER_GAIN,
            voice_gain: OSC_GAIN,
            attack_s: 0.04,
            release_s: 0.12,
            glide_s: 0.07,
            seek_ramp_s: 0.05,
            mix_ramp_s: 0.06,
            finish_ramp_s: 0.06,
            eval_interval_steps: 2,
            hold_steps: 2,
            seek_throttle_ms: 30,
            drag_poll_ms: 50,
            teardown_delay_ms: 140,
            max_echo_s: 0.22,
            lag_echo_per_step_s: 0.015,
            lag_echo_max_s: 0.08,
            lag_echo_min_steps: 2.0,
            event_tick: EventTickConfig::default(),
        }
    }
}

/// Partial configuration; `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOverrides {
    pub base_frequency: Option<f64>,
    pub master_gain: Option<f64>,
    pub voice_gain: Option<f64>,
    pub attack_s: Option<f64>,
    pub release_s: Option<f64>,
    pub glide_s: Option<f64>,
    pub seek_ramp_s: Option<f64>,
    pub mix_ramp_s: Option<f64>,
    pub finish_ramp_s: Option<f64>,
    pub eval_interval_steps: Option<u32>,
    pub hold_steps: Option<u32>,
    pub seek_throttle_ms: Option<u64>,
    pub drag_poll_ms: Option<u64>,
    pub teardown_delay_ms: Option<u64>,
    pub max_echo_s: Option<f64>,
    pub lag_echo_per_step_s: Option<f64>,
    pub lag_echo_max_s: Option<f64>,
    pub lag_echo_min_steps: Option<f64>,
    pub event_tick: Option<EventTickConfig>,
}

impl EngineConfig {
    /// Defaults with every `Some` field of `overrides` applied.
    pub fn with_overrides(overrides: &EngineOverrides) -> Self {
        let d = EngineConfig::default();
        EngineConfig {
            base_frequency: overrides.base_frequency.unwrap_or(d.base_frequency),
            master_gain: overrides.master_gain.unwrap_or(d.master_gain),
            voice_gain: overrides.voice_gain.unwrap_or(d.voice_gain),
            attack_s: overrides.attack_s.unwrap_or(d.attack_s),
            release_s: overrides.release_s.unwrap_or(d.release_s),
            glide_s: overrides.glide_s.unwrap_or(d.glide_s),
            seek_ramp_s: overrides.seek_ramp_s.unwrap_or(d.seek_ramp_s),
            mix_ramp_s: overrides.mix_ramp_s.unwrap_or(d.mix_ramp_s),
            finish_ramp_s: overrides.finish_ramp_s.unwrap_or(d.finish_ramp_s),
            eval_interval_steps: overrides.eval_interval_steps.unwrap_or(d.eval_interval_steps),
            hold_steps: overrides.hold_steps.unwrap_or(d.hold_steps),
            seek_throttle_ms: overrides.seek_throttle_ms.unwrap_or(d.seek_throttle_ms),
            drag_poll_ms: overrides.drag_poll_ms.unwrap_or(d.drag_poll_ms),
            teardown_delay_ms: overrides.teardown_delay_ms.unwrap_or(d.teardown_delay_ms),
            max_echo_s: overrides.max_echo_s.unwrap_or(d.max_echo_s),
            lag_echo_per_step_s: overrides.lag_echo_per_step_s.unwrap_or(d.lag_echo_per_step_s),
            lag_echo_max_s: overrides.lag_echo_max_s.unwrap_or(d.lag_echo_max_s),
            lag_echo_min_steps: overrides.lag_echo_min_steps.unwrap_or(d.lag_echo_min_steps),
            event_tick: overrides.event_tick.unwrap_or(d.event_tick),
        }
    }
}

/// Independently toggleable sound layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layers {
    /// Master gain on/off.
    pub harmony: bool,
    /// Harmony-voice gain shaped by divergence or plan tension.
    pub tension: bool,
    /// Delay on the harmony voice from lag or plan echo.
    pub echo: bool,
    /// One-shot ticks on regime shifts or plan markers.
    pub events: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Layers {
            harmony: true,
            tension: false,
            echo: false,
            events: false,
        }
    }
}

/// Partial layer update; `None` leaves a layer as it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerOverrides {
    pub harmony: Option<bool>,
    pub tension: Option<bool>,
    pub echo: Option<bool>,
    pub events: Option<bool>,
}

impl Layers {
    pub fn merged(self, overrides: LayerOverrides) -> Layers {
        Layers {
            harmony: overrides.harmony.unwrap_or(self.harmony),
            tension: overrides.tension.unwrap_or(self.tension),
            echo: overrides.echo.unwrap_or(self.echo),
            events: overrides.events.unwrap_or(self.events),
        }
    }
}

/// Where chord, tension and echo come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Analytics drive everything, with chord hysteresis.
    #[default]
    Deterministic,
    /// The active plan segment drives chord, tension and echo.
    Ai,
}

impl RenderMode {
    /// `"ai"` selects plan mode; anything else is deterministic.
    pub fn parse(name: &str) -> RenderMode {
        if name == "ai" {
            RenderMode::Ai
        } else {
            RenderMode::Deterministic
        }
    }
}

/// Settings that outlive a single start/stop cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSettings {
    pub layers: Layers,
    pub mode: RenderMode,
    pub plan: Option<AudioPlan>,
}
