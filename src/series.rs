//! Time-series input types and rendered event markers.
//!
//! Wire names follow the metrics layer (`{ "t": ..., "v": ... }`).

use serde::{Deserialize, Serialize};

/// One observation of a metric. Order within a slice is temporal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// ISO-8601 timestamp of the bucket.
    #[serde(rename = "t")]
    pub timestamp: String,
    /// Metric value.
    #[serde(rename = "v")]
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        SeriesPoint {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Extract the raw values of a series.
pub fn values_of(points: &[SeriesPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

/// Index of the first non-finite value, if any.
pub fn first_non_finite(points: &[SeriesPoint]) -> Option<usize> {
    points.iter().position(|p| !p.value.is_finite())
}

/// A labelled series, used by the compare renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareSeries {
    /// Display label, e.g. `"this_week"`.
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// Direction of a detected outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Spike,
    Dip,
}

/// An outlier marker, anchored at the timestamp of its source point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonifyEvent {
    pub t: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Outlier strength in `[0, 1]`.
    pub strength: f64,
}
