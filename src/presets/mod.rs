//! Offline clip renderers.
//!
//! Each preset is a pure function of its inputs: no shared state, fresh
//! output buffers, safe to run concurrently.

pub mod compare;
pub mod dashboard;
pub mod trend;

use serde::{Deserialize, Serialize};

use crate::series::SonifyEvent;

/// A rendered mono clip plus the outlier markers found while rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonoClip {
    /// Samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    pub events: Vec<SonifyEvent>,
}

impl MonoClip {
    pub fn to_wav(&self, sample_rate: u32) -> Vec<u8> {
        crate::wav::encode_mono(&self.samples, sample_rate)
    }
}

/// Loudness for a normalised value: `0.25 + 0.55 × norm`.
pub(crate) fn amplitude_for(norm: f64) -> f64 {
    0.25 + 0.55 * norm
}
