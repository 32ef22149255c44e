//! Scrubbable realtime sonification of a selection.
//!
//! The engine is single-threaded and cooperative. It never sleeps: the only
//! timer is a deadline the embedder reads with [`PlaybackEngine::timer_deadline_ms`]
//! and services with [`PlaybackEngine::poll_timer`] (or [`PlaybackEngine::tick`]
//! from its own timer). All graph writes happen inside those calls or the
//! control methods, never concurrently.

use tracing::{debug, warn};

use crate::mapping::ChordState;
use crate::plan::AudioPlan;

use super::clock::Clock;
use super::config::{EngineConfig, LayerOverrides, PlaybackSettings, RenderMode};
use super::graph::{AudioBackend, GraphSpec, LiveGraph, ParamId};
use super::host::{PlaybackHost, PlaybackObserver};
use super::session::{PlaybackSession, Snapshot, layer_mix};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    /// Only observable from inside `start()`.
    Starting,
    Playing,
    Paused,
    Scrubbing,
}

/// The graph released by `stop()`, waiting out its fade.
///
/// Call [`Teardown::finish`] once `due_at_ms` has passed.
#[derive(Debug)]
pub struct Teardown<G: LiveGraph> {
    graph: G,
    pub due_at_ms: u64,
}

impl<G: LiveGraph> Teardown<G> {
    /// Stop the voices and close the graph. Failures are logged and dropped.
    pub fn finish(mut self) {
        if let Err(err) = self.graph.stop_voices() {
            debug!(%err, "ignoring voice stop failure during teardown");
        }
        if let Err(err) = self.graph.close() {
            debug!(%err, "ignoring close failure during teardown");
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }
}

pub struct PlaybackEngine<H, O, B: AudioBackend, C> {
    config: EngineConfig,
    host: H,
    observer: O,
    backend: B,
    clock: C,
    settings: PlaybackSettings,
    state: PlaybackState,
    graph: Option<B::Graph>,
    session: Option<PlaybackSession>,
    /// Position kept while no session exists.
    idle_index: usize,
    timer_deadline: Option<u64>,
    last_seek_ms: Option<u64>,
    resume_after_scrub: bool,
}

impl<H, O, B, C> PlaybackEngine<H, O, B, C>
where
    H: PlaybackHost,
    O: PlaybackObserver,
    B: AudioBackend,
    C: Clock,
{
    pub fn new(config: EngineConfig, host: H, observer: O, backend: B, clock: C) -> Self {
        PlaybackEngine {
            config,
            host,
            observer,
            backend,
            clock,
            settings: PlaybackSettings::default(),
            state: PlaybackState::Stopped,
            graph: None,
            session: None,
            idle_index: 0,
            timer_deadline: None,
            last_seek_ms: None,
            resume_after_scrub: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.graph.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_index(&self) -> usize {
        self.session.as_ref().map_or(self.idle_index, |s| s.index)
    }

    pub fn chord_state(&self) -> Option<ChordState> {
        self.session.as_ref().map(|s| s.chord)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> Option<&B::Graph> {
        self.graph.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// When the next tick is due, in clock milliseconds.
    pub fn timer_deadline_ms(&self) -> Option<u64> {
        self.timer_deadline
    }

    // ── Timer ───────────────────────────────────────────────

    /// Run the tick if its deadline has passed. Returns whether it ran.
    pub fn poll_timer(&mut self) -> bool {
        match self.timer_deadline {
            Some(due) if self.clock.now_ms() >= due => {
                self.timer_deadline = None;
                self.tick();
                true
            }
            _ => false,
        }
    }

    fn schedule_in(&mut self, ms: u64) {
        self.timer_deadline = Some(self.clock.now_ms() + ms);
    }

    fn schedule_next_tick(&mut self) {
        let ms = self.host.ms_per_step();
        self.schedule_in(ms);
    }

    fn clear_timer(&mut self) {
        self.timer_deadline = None;
    }

    /// Play one step: pick the chord, remix, maybe fire an event tick,
    /// report the step and reschedule.
    pub fn tick(&mut self) {
        if self.graph.is_none() {
            return;
        }
        if self.host.is_dragging() || self.host.is_scrubbing() {
            self.schedule_in(self.config.drag_poll_ms);
            return;
        }

        let selection = self.host.selection();
        let index = self.current_index();

        if index > selection.end {
            if self.host.looping() {
                if let Some(session) = self.session.as_mut() {
                    session.last_event_index = None;
                }
                self.apply_playback_index(selection.start, true);
                self.schedule_next_tick();
            } else {
                self.set_index(selection.end);
                self.observer.on_step(selection.end);
                self.finish_playback();
            }
            return;
        }

        let snap = Snapshot::read(&self.host, &self.settings, index);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = session.advance_tick(&self.config, &self.settings, &snap, selection.start);

        if let Some(chord) = outcome.chord_change {
            debug!(index, %chord, "chord change");
            self.observer.on_chord_state(chord);
            let target = self.config.base_frequency * chord.ratio();
            self.ramp(ParamId::HarmonyFrequency, target, self.config.glide_s);
        }

        self.apply_layer_mix(index);

        if outcome.fire_event {
            if let Some(graph) = self.graph.as_mut() {
                if let Err(err) = graph.play_event_tick(&self.config.event_tick) {
                    debug!(index, %err, "event tick skipped");
                }
            }
        }

        self.observer.on_step(index);
        self.schedule_next_tick();
    }

    // ── Graph helpers ───────────────────────────────────────

    fn ramp(&mut self, id: ParamId, target: f64, seconds: f64) {
        if let Some(graph) = self.graph.as_mut() {
            graph.ramp(id, target, seconds);
        }
    }

    fn harmony_master_gain(&self) -> f64 {
        if self.settings.layers.harmony {
            self.config.master_gain
        } else {
            0.0
        }
    }

    fn set_index(&mut self, index: usize) {
        match self.session.as_mut() {
            Some(session) => session.index = index,
            None => self.idle_index = index,
        }
    }

    fn apply_layer_mix(&mut self, index: usize) {
        if self.graph.is_none() {
            return;
        }
        let snap = Snapshot::read(&self.host, &self.settings, index);
        let mix = layer_mix(&self.config, self.settings.layers, self.settings.mode, &snap);
        let mix_ramp = self.config.mix_ramp_s;
        self.ramp(ParamId::MasterGain, mix.master_gain, self.config.seek_ramp_s);
        self.ramp(ParamId::LeadGain, mix.lead_gain, mix_ramp);
        self.ramp(ParamId::HarmonyGain, mix.harmony_gain, mix_ramp);
        self.ramp(ParamId::EchoDelay, mix.echo_s, mix_ramp);
    }

    /// Move to `index`. With a live graph the chord is re-derived and both
    /// voices glide; unless `force`d, graph writes are rate limited.
    fn apply_playback_index(&mut self, index: usize, force: bool) {
        self.set_index(index);
        self.observer.on_step(index);

        if self.graph.is_none() {
            return;
        }
        let now = self.clock.now_ms();
        if !force {
            if let Some(last) = self.last_seek_ms {
                if now.saturating_sub(last) < self.config.seek_throttle_ms {
                    return;
                }
            }
        }
        self.last_seek_ms = Some(now);

        let snap = Snapshot::read(&self.host, &self.settings, index);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let chord = session.reseat(&self.config, self.settings.mode, &snap, index);
        self.observer.on_chord_state(chord);

        let base = self.config.base_frequency;
        let seek_ramp = self.config.seek_ramp_s;
        self.ramp(ParamId::LeadFrequency, base, seek_ramp);
        self.ramp(ParamId::HarmonyFrequency, base * chord.ratio(), seek_ramp);
        self.apply_layer_mix(index);
    }

    fn finish_playback(&mut self) {
        self.ramp(ParamId::MasterGain, 0.0, self.config.finish_ramp_s);
        self.observer.on_playing(false);
        if self.graph.is_some() {
            self.state = PlaybackState::Paused;
        }
    }

    // ── Controls ────────────────────────────────────────────

    /// Create the graph and start playing from the selection start.
    /// A no-op while already active; a backend failure leaves the engine stopped.
    pub fn start(&mut self) {
        if self.graph.is_some() {
            return;
        }
        self.state = PlaybackState::Starting;

        let start = self.host.selection().start;
        let snap = Snapshot::read(&self.host, &self.settings, start);
        let session = PlaybackSession::seed(&self.config, self.settings.mode, &snap, start);

        let spec = GraphSpec {
            lead_frequency: self.config.base_frequency,
            harmony_frequency: self.config.base_frequency * session.chord.ratio(),
            voice_gain: self.config.voice_gain,
            max_echo_s: self.config.max_echo_s,
        };
        let graph = match self.backend.create_graph(&spec) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(%err, "could not create audio graph; playback stays stopped");
                self.state = PlaybackState::Stopped;
                return;
            }
        };

        self.observer.on_chord_state(session.chord);
        self.session = Some(session);
        self.graph = Some(graph);
        self.observer.on_active(true);
        self.apply_playback_index(start, true);

        let target = self.harmony_master_gain();
        let attack = self.config.attack_s;
        if let Some(graph) = self.graph.as_mut() {
            let now = graph.now();
            let master = graph.param(ParamId::MasterGain);
            master.set_value_at(0.0, now);
            master.linear_ramp_to(target, now + attack);
        }

        self.observer.on_playing(true);
        self.state = PlaybackState::Playing;
        self.schedule_next_tick();
        debug!(start, "playback started");
    }

    pub fn pause(&mut self) {
        if self.graph.is_none() {
            return;
        }
        self.clear_timer();
        self.ramp(ParamId::MasterGain, 0.0, self.config.attack_s);
        self.observer.on_playing(false);
        self.state = PlaybackState::Paused;
    }

    pub fn resume(&mut self) {
        if self.graph.is_none() {
            return;
        }
        self.clear_timer();
        let target = self.harmony_master_gain();
        self.ramp(ParamId::MasterGain, target, self.config.attack_s);
        self.observer.on_playing(true);
        self.state = PlaybackState::Playing;
        self.schedule_next_tick();
    }

    /// Detach immediately and report stopped. The returned teardown fades
    /// the old graph out and must be finished after its delay.
    pub fn stop(&mut self) -> Option<Teardown<B::Graph>> {
        self.clear_timer();
        let old_graph = self.graph.take();
        if let Some(session) = self.session.take() {
            self.idle_index = session.index;
        }
        self.resume_after_scrub = false;
        self.state = PlaybackState::Stopped;

        self.observer.on_playing(false);
        self.observer.on_active(false);

        let mut graph = old_graph?;
        graph.ramp(ParamId::MasterGain, 0.0, self.config.release_s);
        debug!(index = self.idle_index, "playback stopped");
        Some(Teardown {
            graph,
            due_at_ms: self.clock.now_ms() + self.config.teardown_delay_ms,
        })
    }

    /// Suspend the tick loop for a scrub, remembering whether to resume.
    pub fn begin_scrub(&mut self) {
        self.resume_after_scrub = self.state == PlaybackState::Playing;
        self.pause();
        if self.graph.is_some() {
            self.state = PlaybackState::Scrubbing;
        }
    }

    /// Resume if playback was running when the scrub began; otherwise
    /// just bring the master back up so the parked position is audible.
    pub fn end_scrub(&mut self) {
        self.end_scrub_with(self.resume_after_scrub);
    }

    /// [`end_scrub`](Self::end_scrub) with an explicit resume decision.
    pub fn end_scrub_with(&mut self, should_resume: bool) {
        self.resume_after_scrub = false;
        if should_resume {
            self.resume();
        } else if self.graph.is_some() {
            let target = self.harmony_master_gain();
            self.ramp(ParamId::MasterGain, target, self.config.seek_ramp_s);
            self.state = PlaybackState::Paused;
        }
    }

    /// Seek. Graph writes are throttled; the step is always reported.
    pub fn set_playback_index(&mut self, index: usize) {
        self.apply_playback_index(index, false);
    }

    /// Seek without the rate limit, for discrete jumps such as a click.
    pub fn seek(&mut self, index: usize) {
        self.apply_playback_index(index, true);
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.settings.mode = mode;
        self.apply_playback_index(self.current_index(), true);
    }

    /// Install or clear the plan.
    pub fn set_ai_plan(&mut self, plan: Option<AudioPlan>) {
        self.settings.plan = plan;
        self.apply_playback_index(self.current_index(), true);
    }

    pub fn set_enabled_layers(&mut self, overrides: LayerOverrides) {
        self.settings.layers = self.settings.layers.merged(overrides);
        self.apply_layer_mix(self.current_index());
    }
}
