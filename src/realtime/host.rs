//! What the engine reads from, and reports to, the application hosting it.

use std::collections::BTreeSet;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::mapping::ChordState;

/// Inclusive index range being played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Selection { start, end }
    }

    /// `index - start`, clamped into the selection.
    pub fn relative(&self, index: usize) -> usize {
        index
            .saturating_sub(self.start)
            .min(self.end.saturating_sub(self.start))
    }
}

/// Live inputs the engine polls on every tick.
pub trait PlaybackHost {
    fn selection(&self) -> Selection;
    /// Smoothed correlation at `index`.
    fn rho_e(&self, index: usize) -> Option<f64>;
    /// Smoothed divergence at `index`.
    fn div_e(&self, index: usize) -> Option<f64>;
    /// Estimated lag (in steps) at `index`.
    fn lag(&self, index: usize) -> Option<f64>;
    /// Whether `index` is a detected regime shift.
    fn is_shift(&self, index: usize) -> bool;
    fn ms_per_step(&self) -> u64;
    fn looping(&self) -> bool;
    fn is_dragging(&self) -> bool {
        false
    }
    fn is_scrubbing(&self) -> bool {
        false
    }
}

/// Precomputed analytics with a fixed selection and speed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsHost {
    pub selection: Selection,
    pub rho_e: Vec<Option<f64>>,
    pub div_e: Vec<Option<f64>>,
    pub lags: Vec<Option<f64>>,
    pub shifts: BTreeSet<usize>,
    pub ms_per_step: u64,
    pub looping: bool,
    pub dragging: bool,
    pub scrubbing: bool,
}

impl PlaybackHost for AnalyticsHost {
    fn selection(&self) -> Selection {
        self.selection
    }
    fn rho_e(&self, index: usize) -> Option<f64> {
        self.rho_e.get(index).copied().flatten()
    }
    fn div_e(&self, index: usize) -> Option<f64> {
        self.div_e.get(index).copied().flatten()
    }
    fn lag(&self, index: usize) -> Option<f64> {
        self.lags.get(index).copied().flatten()
    }
    fn is_shift(&self, index: usize) -> bool {
        self.shifts.contains(&index)
    }
    fn ms_per_step(&self) -> u64 {
        self.ms_per_step
    }
    fn looping(&self) -> bool {
        self.looping
    }
    fn is_dragging(&self) -> bool {
        self.dragging
    }
    fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }
}

/// A state change reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Step(usize),
    Playing(bool),
    Active(bool),
    ChordState(ChordState),
}

/// Receives engine notifications synchronously. Every hook defaults to a no-op.
pub trait PlaybackObserver {
    fn on_step(&mut self, _index: usize) {}
    fn on_playing(&mut self, _playing: bool) {}
    fn on_active(&mut self, _active: bool) {}
    fn on_chord_state(&mut self, _chord: ChordState) {}
}

impl PlaybackObserver for () {}

/// Channel form: every notification becomes a [`PlaybackEvent`].
/// A dropped receiver just stops the flow.
impl PlaybackObserver for Sender<PlaybackEvent> {
    fn on_step(&mut self, index: usize) {
        let _ = self.send(PlaybackEvent::Step(index));
    }
    fn on_playing(&mut self, playing: bool) {
        let _ = self.send(PlaybackEvent::Playing(playing));
    }
    fn on_active(&mut self, active: bool) {
        let _ = self.send(PlaybackEvent::Active(active));
    }
    fn on_chord_state(&mut self, chord: ChordState) {
        let _ = self.send(PlaybackEvent::ChordState(chord));
    }
}

impl PlaybackObserver for Vec<PlaybackEvent> {
    fn on_step(&mut self, index: usize) {
        self.push(PlaybackEvent::Step(index));
    }
    fn on_playing(&mut self, playing: bool) {
        self.push(PlaybackEvent::Playing(playing));
    }
    fn on_active(&mut self, active: bool) {
        self.push(PlaybackEvent::Active(active));
    }
    fn on_chord_state(&mut self, chord: ChordState) {
        self.push(PlaybackEvent::ChordState(chord));
    }
}
