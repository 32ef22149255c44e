//! Realtime playback: a step-driven player for a selection of
//! analytics, rendered through a small live audio graph.
//!
//! The engine itself is synchronous; [`driver`] (feature `driver`) runs it
//! on a tokio task.

pub mod clock;
pub mod config;
#[cfg(feature = "driver")]
pub mod driver;
pub mod engine;
pub mod graph;
pub mod host;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, EngineOverrides, LayerOverrides, Layers, PlaybackSettings, RenderMode};
pub use engine::{PlaybackEngine, PlaybackState, Teardown};
pub use graph::{AudioBackend, AutomationTimeline, GraphSpec, LiveGraph, ParamId, VirtualBackend};
pub use host::{AnalyticsHost, PlaybackEvent, PlaybackHost, PlaybackObserver, Selection};
