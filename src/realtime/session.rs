//! Per-run playback state and the pure step functions that evolve it.
//!
//! Nothing here touches an audio graph, so the chord hysteresis and layer
//! mixing can be exercised directly.

use crate::mapping::ChordState;
use crate::plan::{AudioPlan, AudioPlanSegment};

use super::config::{EngineConfig, Layers, PlaybackSettings, RenderMode};
use super::host::{PlaybackHost, Selection};

/// Analytics (and plan segment) at one index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub rho: f64,
    pub div: f64,
    pub lag: f64,
    pub is_shift: bool,
    /// Only set in AI mode when the plan covers the index.
    pub segment: Option<AudioPlanSegment>,
}

impl Snapshot {
    /// Read `index` from the host; missing analytics read as 0.
    pub fn read<H: PlaybackHost + ?Sized>(host: &H, settings: &PlaybackSettings, index: usize) -> Self {
        let selection = host.selection();
        Snapshot {
            rho: host.rho_e(index).unwrap_or(0.0),
            div: host.div_e(index).unwrap_or(0.0),
            lag: host.lag(index).unwrap_or(0.0),
            is_shift: host.is_shift(index),
            segment: active_segment(settings, selection, index).cloned(),
        }
    }

    /// The plan segment, if it is in charge of this step.
    fn plan_segment(&self, mode: RenderMode) -> Option<&AudioPlanSegment> {
        match mode {
            RenderMode::Ai => self.segment.as_ref(),
            RenderMode::Deterministic => None,
        }
    }
}

/// Plan segment covering `index`, looked up relative to the selection start.
pub fn active_segment<'a>(
    settings: &'a PlaybackSettings,
    selection: Selection,
    index: usize,
) -> Option<&'a AudioPlanSegment> {
    if settings.mode != RenderMode::Ai {
        return None;
    }
    settings
        .plan
        .as_ref()
        .and_then(|plan: &AudioPlan| plan.segment_at(selection.relative(index)))
}

/// Chord re-evaluation with per-state exit bands, so a correlation hovering
/// near a threshold does not flip the chord back and forth.
pub fn banded_chord_update(current: ChordState, rho_e: Option<f64>) -> ChordState {
    let r = rho_e.unwrap_or(0.0);
    match current {
        ChordState::Fifth if r < 0.55 => {
            if r > 0.25 {
                ChordState::Third
            } else if r < -0.25 {
                ChordState::Tritone
            } else {
                ChordState::Unison
            }
        }
        ChordState::Fifth => ChordState::Fifth,
        ChordState::Third if r > 0.65 => ChordState::Fifth,
        ChordState::Third if r < 0.15 => {
            if r < -0.25 {
                ChordState::Tritone
            } else {
                ChordState::Unison
            }
        }
        ChordState::Third => ChordState::Third,
        ChordState::Tritone if r > -0.15 => {
            if r > 0.65 {
                ChordState::Fifth
            } else if r > 0.25 {
                ChordState::Third
            } else {
                ChordState::Unison
            }
        }
        ChordState::Tritone => ChordState::Tritone,
        ChordState::Unison => ChordState::from_rho_e(Some(r)),
    }
}

/// Gain and delay targets for the graph at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerMix {
    pub master_gain: f64,
    pub lead_gain: f64,
    pub harmony_gain: f64,
    pub echo_s: f64,
}

pub fn layer_mix(cfg: &EngineConfig, layers: Layers, mode: RenderMode, snap: &Snapshot) -> LayerMix {
    let master_gain = if layers.harmony { cfg.master_gain } else { 0.0 };

    let (harmony_gain, echo_s) = match snap.plan_segment(mode) {
        Some(seg) => {
            let plan_gain = 0.9 - 0.18 * seg.tension.clamp(0.0, 1.0);
            let gain = cfg.voice_gain * if layers.tension { plan_gain } else { 1.0 };
            let echo = if layers.echo {
                (seg.echo_ms / 1000.0).clamp(0.0, cfg.max_echo_s)
            } else {
                0.0
            };
            (gain, echo)
        }
        None => {
            let alignment = 0.6 + 0.4 * snap.rho.abs().clamp(0.0, 1.0);
            let tension = if layers.tension {
                (1.0 - snap.div * 0.05).max(0.82)
            } else {
                1.0
            };
            let lag = snap.lag.abs();
            let echo = if layers.echo && lag >= cfg.lag_echo_min_steps {
                (lag * cfg.lag_echo_per_step_s).min(cfg.lag_echo_max_s)
            } else {
                0.0
            };
            (cfg.voice_gain * alignment * tension, echo)
        }
    };

    LayerMix {
        master_gain,
        lead_gain: cfg.voice_gain,
        harmony_gain,
        echo_s,
    }
}

/// What a tick decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// New chord, to be announced and glided to.
    pub chord_change: Option<ChordState>,
    pub fire_event: bool,
}

/// State owned by one playback run, from `start()` to `stop()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub index: usize,
    pub chord: ChordState,
    pub hold_remaining: u32,
    pub steps_since_eval: u32,
    /// Last index that fired an event tick.
    pub last_event_index: Option<usize>,
}

impl PlaybackSession {
    /// Fresh session positioned at `index`, chord taken from `snap`.
    pub fn seed(cfg: &EngineConfig, mode: RenderMode, snap: &Snapshot, index: usize) -> Self {
        PlaybackSession {
            index,
            chord: seek_chord(mode, snap),
            hold_remaining: cfg.hold_steps,
            steps_since_eval: 0,
            last_event_index: None,
        }
    }

    /// Jump to `index`: the chord is re-derived without hysteresis and the
    /// counters restart.
    pub fn reseat(&mut self, cfg: &EngineConfig, mode: RenderMode, snap: &Snapshot, index: usize) -> ChordState {
        self.index = index;
        self.chord = seek_chord(mode, snap);
        self.hold_remaining = cfg.hold_steps;
        self.steps_since_eval = 0;
        self.chord
    }

    /// Play the step at `self.index` and move to the next one.
    pub fn advance_tick(
        &mut self,
        cfg: &EngineConfig,
        settings: &PlaybackSettings,
        snap: &Snapshot,
        selection_start: usize,
    ) -> TickOutcome {
        let index = self.index;
        let mut outcome = TickOutcome::default();
        let segment = snap.plan_segment(settings.mode);

        match segment {
            Some(seg) => {
                if seg.chord != self.chord {
                    self.chord = seg.chord;
                    outcome.chord_change = Some(seg.chord);
                }
            }
            None => {
                self.hold_remaining = self.hold_remaining.saturating_sub(1);
                self.steps_since_eval += 1;
                if self.hold_remaining == 0 && self.steps_since_eval >= cfg.eval_interval_steps {
                    self.steps_since_eval = 0;
                    let next = banded_chord_update(self.chord, Some(snap.rho));
                    if next != self.chord {
                        self.chord = next;
                        self.hold_remaining = cfg.hold_steps;
                        outcome.chord_change = Some(next);
                    }
                }
            }
        }

        let should_tick = match segment {
            Some(seg) => seg.tick && index == selection_start + seg.start_step,
            None => snap.is_shift,
        };
        if settings.layers.events && should_tick && self.last_event_index != Some(index) {
            self.last_event_index = Some(index);
            outcome.fire_event = true;
        }

        self.index = index + 1;
        outcome
    }
}

fn seek_chord(mode: RenderMode, snap: &Snapshot) -> ChordState {
    match snap.plan_segment(mode) {
        Some(seg) => seg.chord,
        None => ChordState::from_rho_e(Some(snap.rho)),
    }
}
