//! DSP building blocks for the offline clip renderers.
//!
//! Everything works on `f64` buffers; conversion to `f32` happens once at
//! the end of a render.

pub mod delay;
pub mod envelope;
pub mod filter;
pub mod interpolate;
pub mod mixer;
pub mod oscillator;
pub mod reverb;
