pub mod config;
pub mod dsp; // Signal primitives for the reference renderer
pub mod error;
pub mod io; // Library storage, MIDI export, TD-3 sheets
pub mod runtime; // Transport and the engine context
pub mod sequencing; // Notes, patterns, chains and undo history
pub mod synth; // Chain scheduling and the audio backend seam

pub use error::{Error, Result};

/// Largest block the renderer is asked for in one callback
pub const MAX_BLOCK_SIZE: usize = 2048;
