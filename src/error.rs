//! Error type shared by the fallible edges of the crate.
//!
//! Pattern editing, chain resolution and the transport tick are total and
//! never produce an `Error`; only file access, text parsing and the few
//! user-reportable conditions (like an empty track chain) do.

use thiserror::Error;

/// Result alias for acidstep operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error while reading or writing persisted data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON text could not be parsed at all
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Track playback requested with no patterns selected
    #[error("track chain is empty")]
    EmptyTrackChain,

    #[error("unknown knob: {0}")]
    UnknownKnob(String),

    #[error("unknown step flag: {0}")]
    UnknownFlag(String),

    #[error("unknown drum instrument: {0}")]
    UnknownInstrument(String),

    /// No audio output could be opened
    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),
}
