//! Externally generated audio plan.
//!
//! The planner validates its own output (contiguous segments covering the
//! selection, chord names, tension range, echo band). This module only
//! decodes it; anything that fails to decode is treated as "no plan" and
//! the realtime engine falls back to deterministic mapping.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mapping::ChordState;

/// One contiguous span of the selection, indexed relative to its start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPlanSegment {
    #[serde(rename = "startStep")]
    pub start_step: usize,
    /// Inclusive.
    #[serde(rename = "endStep")]
    pub end_step: usize,
    pub chord: ChordState,
    /// `[0, 1]`; lowers the harmony voice gain when the tension layer is on.
    pub tension: f64,
    /// Echo delay for this segment, in milliseconds.
    pub echo_ms: f64,
    /// Fire an event tick at the first step of the segment.
    #[serde(default)]
    pub tick: bool,
}

impl AudioPlanSegment {
    pub fn contains(&self, relative_step: usize) -> bool {
        relative_step >= self.start_step && relative_step <= self.end_step
    }
}

/// Ordered list of plan segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioPlan {
    pub segments: Vec<AudioPlanSegment>,
}

/// Planner responses wrap the segments in an `audio_plan` object next to
/// captions and markers this crate does not use.
#[derive(Deserialize)]
struct PlanEnvelope {
    audio_plan: AudioPlan,
}

impl AudioPlan {
    /// Decode a plan from JSON text. Accepts either the planner envelope
    /// (`{"audio_plan": {"segments": [...]}}`) or a bare `{"segments": [...]}`.
    ///
    /// Malformed input yields `None`.
    pub fn from_json(text: &str) -> Option<AudioPlan> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                warn!(error = %e, "audio plan is not valid JSON; ignoring");
                None
            }
        }
    }

    /// Decode a plan from an already-parsed JSON value. Malformed input yields `None`.
    pub fn from_value(value: serde_json::Value) -> Option<AudioPlan> {
        let decoded = if value.get("audio_plan").is_some() {
            serde_json::from_value::<PlanEnvelope>(value).map(|env| env.audio_plan)
        } else {
            serde_json::from_value::<AudioPlan>(value)
        };

        match decoded {
            Ok(plan) if plan.segments.is_empty() => None,
            Ok(plan) => Some(plan),
            Err(e) => {
                warn!(error = %e, "audio plan failed to decode; ignoring");
                None
            }
        }
    }

    /// The segment covering `relative_step`, if any.
    pub fn segment_at(&self, relative_step: usize) -> Option<&AudioPlanSegment> {
        self.segments.iter().find(|s| s.contains(relative_step))
    }
}
