use thiserror::Error;

/// Request validation failures from the render pipeline.
///
/// The renderers themselves never fail; degenerate input renders silence.
#[derive(Error, Debug)]
pub enum SonifyError {
    #[error("Series '{label}' has no points")]
    EmptySeries { label: String },

    #[error("Series '{label}' has a non-finite value at index {index}")]
    NonFiniteValue { label: String, index: usize },

    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("Duration must be a positive number of milliseconds, got {0}")]
    InvalidDuration(f64),

    #[error("Speed must be a positive number, got {0}")]
    InvalidSpeed(f64),

    #[error("A {duration_ms} ms clip at {sample_rate} Hz exceeds the {max_frames} frame limit")]
    ClipTooLong {
        duration_ms: f64,
        sample_rate: u32,
        max_frames: usize,
    },

    #[error("Invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the live audio graph behind the realtime engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Audio backend unavailable: {0}")]
    Unavailable(String),

    #[error("Audio node failed: {0}")]
    Node(String),

    #[error("Audio graph already closed")]
    Closed,
}
