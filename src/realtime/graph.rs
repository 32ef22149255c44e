//! Live audio graph abstraction.
//!
//! The engine never touches audio buffers. It drives a small fixed graph:
//!
//! ```text
//!   lead voice ── lead gain ───────────────┐
//!                                          ├── master gain ── output
//!   harmony voice ── echo delay ── gain ───┘
//! ```
//!
//! Every controllable value is an [`AutomationTimeline`], so a backend only
//! has to evaluate timelines at its own clock to render sound.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::GraphError;

use super::clock::Clock;
use super::config::EventTickConfig;

/// Addressable graph parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    MasterGain,
    LeadFrequency,
    LeadGain,
    HarmonyFrequency,
    HarmonyGain,
    EchoDelay,
}

impl ParamId {
    pub const ALL: [ParamId; 6] = [
        ParamId::MasterGain,
        ParamId::LeadFrequency,
        ParamId::LeadGain,
        ParamId::HarmonyFrequency,
        ParamId::HarmonyGain,
        ParamId::EchoDelay,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AutomationKind {
    Set,
    LinearRamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutomationEvent {
    time: f64,
    value: f64,
    kind: AutomationKind,
}

/// Scheduled values of one parameter, in graph seconds.
///
/// `Set` jumps at its time; `LinearRamp` interpolates from the previous
/// event's value and time up to its own.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationTimeline {
    initial: f64,
    events: Vec<AutomationEvent>,
}

impl AutomationTimeline {
    pub fn new(initial: f64) -> Self {
        AutomationTimeline {
            initial,
            events: Vec::new(),
        }
    }

    fn insert(&mut self, event: AutomationEvent) {
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
    }

    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(AutomationEvent {
            time,
            value,
            kind: AutomationKind::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(AutomationEvent {
            time: end_time,
            value,
            kind: AutomationKind::LinearRamp,
        });
    }

    /// Drop every event at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    /// Cancel what is scheduled, hold the current value, then ramp to
    /// `target` over `seconds`. A newer ramp always supersedes an older one.
    pub fn ramp(&mut self, now: f64, target: f64, seconds: f64) {
        let current = self.value_at(now);
        self.cancel_from(now);
        self.set_value_at(current, now);
        self.linear_ramp_to(target, now + seconds);
    }

    pub fn value_at(&self, time: f64) -> f64 {
        let (mut prev_time, mut prev_value) = (0.0, self.initial);
        for e in &self.events {
            if e.time > time {
                return match e.kind {
                    AutomationKind::Set => prev_value,
                    AutomationKind::LinearRamp => {
                        let span = e.time - prev_time;
                        if span <= 0.0 {
                            e.value
                        } else {
                            let frac = ((time - prev_time) / span).clamp(0.0, 1.0);
                            prev_value + (e.value - prev_value) * frac
                        }
                    }
                };
            }
            prev_time = e.time;
            prev_value = e.value;
        }
        prev_value
    }

    /// Value once every scheduled event has run.
    pub fn final_value(&self) -> f64 {
        self.events.last().map_or(self.initial, |e| e.value)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Initial values for a fresh graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSpec {
    pub lead_frequency: f64,
    pub harmony_frequency: f64,
    pub voice_gain: f64,
    /// Capacity of the echo delay line.
    pub max_echo_s: f64,
}

impl GraphSpec {
    pub fn initial_value(&self, id: ParamId) -> f64 {
        match id {
            ParamId::MasterGain | ParamId::EchoDelay => 0.0,
            ParamId::LeadFrequency => self.lead_frequency,
            ParamId::HarmonyFrequency => self.harmony_frequency,
            ParamId::LeadGain | ParamId::HarmonyGain => self.voice_gain,
        }
    }
}

/// A running graph.
pub trait LiveGraph {
    /// Graph clock, in seconds.
    fn now(&self) -> f64;
    fn param(&mut self, id: ParamId) -> &mut AutomationTimeline;
    fn timeline(&self, id: ParamId) -> &AutomationTimeline;
    /// Fire a one-shot tick straight to the output.
    fn play_event_tick(&mut self, tick: &EventTickConfig) -> Result<(), GraphError>;
    fn stop_voices(&mut self) -> Result<(), GraphError>;
    fn close(&mut self) -> Result<(), GraphError>;

    fn ramp(&mut self, id: ParamId, target: f64, seconds: f64) {
        let now = self.now();
        self.param(id).ramp(now, target, seconds);
    }
}

/// Creates graphs; the engine asks for one on every `start()`.
pub trait AudioBackend {
    type Graph: LiveGraph;

    fn create_graph(&mut self, spec: &GraphSpec) -> Result<Self::Graph, GraphError>;
}

// ── In-memory backend ───────────────────────────────────────

/// Counters and failure switches shared by a [`VirtualBackend`] and its graphs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualState {
    pub graphs_created: usize,
    pub event_ticks: usize,
    pub voices_stopped: usize,
    pub graphs_closed: usize,
    pub fail_create: bool,
    pub fail_ticks: bool,
    pub fail_teardown: bool,
}

type SharedState = Arc<Mutex<VirtualState>>;

fn with_state<R>(state: &SharedState, f: impl FnOnce(&mut VirtualState) -> R) -> R {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Backend that records automation instead of producing sound.
#[derive(Debug, Clone)]
pub struct VirtualBackend<C> {
    clock: C,
    state: SharedState,
}

impl<C: Clock + Clone> VirtualBackend<C> {
    pub fn new(clock: C) -> Self {
        VirtualBackend {
            clock,
            state: SharedState::default(),
        }
    }

    /// Handle for inspecting counters and toggling failures.
    pub fn state(&self) -> Arc<Mutex<VirtualState>> {
        Arc::clone(&self.state)
    }
}

impl<C: Clock + Clone> AudioBackend for VirtualBackend<C> {
    type Graph = VirtualGraph<C>;

    fn create_graph(&mut self, spec: &GraphSpec) -> Result<VirtualGraph<C>, GraphError> {
        with_state(&self.state, |s| {
            if s.fail_create {
                return Err(GraphError::Unavailable("virtual backend disabled".into()));
            }
            s.graphs_created += 1;
            Ok(())
        })?;
        Ok(VirtualGraph {
            clock: self.clock.clone(),
            params: ParamId::ALL.map(|id| AutomationTimeline::new(spec.initial_value(id))),
            spec: *spec,
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct VirtualGraph<C> {
    clock: C,
    params: [AutomationTimeline; 6],
    spec: GraphSpec,
    state: SharedState,
    closed: bool,
}

impl<C> VirtualGraph<C> {
    pub fn spec(&self) -> &GraphSpec {
        &self.spec
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<C: Clock> LiveGraph for VirtualGraph<C> {
    fn now(&self) -> f64 {
        self.clock.now_s()
    }

    fn param(&mut self, id: ParamId) -> &mut AutomationTimeline {
        &mut self.params[id.slot()]
    }

    fn timeline(&self, id: ParamId) -> &AutomationTimeline {
        &self.params[id.slot()]
    }

    fn play_event_tick(&mut self, _tick: &EventTickConfig) -> Result<(), GraphError> {
        if self.closed {
            return Err(GraphError::Closed);
        }
        with_state(&self.state, |s| {
            if s.fail_ticks {
                return Err(GraphError::Node("tick oscillator".into()));
            }
            s.event_ticks += 1;
            Ok(())
        })
    }

    fn stop_voices(&mut self) -> Result<(), GraphError> {
        with_state(&self.state, |s| {
            if s.fail_teardown {
                return Err(GraphError::Node("voice already stopped".into()));
            }
            s.voices_stopped += 1;
            Ok(())
        })
    }

    fn close(&mut self) -> Result<(), GraphError> {
        if self.closed {
            return Err(GraphError::Closed);
        }
        self.closed = true;
        with_state(&self.state, |s| s.graphs_closed += 1);
        Ok(())
    }
}
