//! Low-level DSP primitives used by the reference renderer.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so voices can own them directly and run inside the audio callback.

/// Timestamped set / linear / exponential parameter lanes.
pub mod automation;
/// Drive curve and soft clipping.
pub mod distortion;
/// State-variable filter.
pub mod filter;
/// Band-limited saw and square, sine, and noise.
pub mod oscillator;

pub use automation::{AutomationLane, AutomationPoint, Ramp};
pub use filter::SVFilter;
pub use oscillator::{Oscillator, OscillatorWaveform};
