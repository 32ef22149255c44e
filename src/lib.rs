pub mod dsp;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod plan;
pub mod presets;
pub mod realtime;
pub mod series;
pub mod wav;

use crate::pipeline::{DashboardRequest, SonifyCompareRequest, SonifySeriesRequest};
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sonify-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn from_js<T: serde::de::DeserializeOwned>(request: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(request).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a `trend_v1` request to a mono WAV byte array.
#[wasm_bindgen]
pub fn render_series_wav(request: JsValue) -> Result<Vec<u8>, JsValue> {
    let request: SonifySeriesRequest = from_js(request)?;
    let clip =
        pipeline::render_series_clip(&request).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(clip.wav)
}

/// WASM-exposed: render a `compare_v1` request to a mono WAV byte array.
#[wasm_bindgen]
pub fn render_compare_wav(request: JsValue) -> Result<Vec<u8>, JsValue> {
    let request: SonifyCompareRequest = from_js(request)?;
    let clip =
        pipeline::render_compare_clip(&request).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(clip.wav)
}

/// WASM-exposed: render a traffic/revenue dashboard to a stereo WAV byte array.
#[wasm_bindgen]
pub fn render_dashboard_wav(request: JsValue) -> Result<Vec<u8>, JsValue> {
    let request: DashboardRequest = from_js(request)?;
    let clip = pipeline::render_dashboard_clip(&request)
        .map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(clip.wav)
}

/// WASM-exposed: metadata for a series request (duration and events),
/// without the audio.
#[wasm_bindgen]
pub fn series_meta(request: JsValue) -> Result<JsValue, JsValue> {
    let request: SonifySeriesRequest = from_js(request)?;
    let clip =
        pipeline::render_series_clip(&request).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    serde_wasm_bindgen::to_value(&clip.meta).map_err(|e| JsValue::from_str(&format!("{e}")))
}
