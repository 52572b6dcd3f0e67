//! Engine configuration.
//!
//! Stored as TOML. Every field is optional in the file; missing ones take the
//! defaults below and out-of-range values are clamped on load.
//!
//! ```toml
//! bpm = 128
//! history_capacity = 150
//! knob_settle_ms = 250
//! lookahead_ms = 40
//! master_gain = 0.3
//! storage_dir = "/home/me/.local/share/acidstep"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tempo in quarter-note beats per minute
    pub bpm: f64,
    /// Undo snapshots kept before the oldest is dropped
    pub history_capacity: usize,
    /// Quiet period after a knob move before it becomes an undo step
    pub knob_settle_ms: u64,
    /// How far ahead of the audio clock ticks are scheduled
    pub lookahead_ms: u64,
    /// Output level of the renderer
    pub master_gain: f32,
    /// Pattern library directory; in-memory only when unset
    pub storage_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            history_capacity: 100,
            knob_settle_ms: 250,
            lookahead_ms: 40,
            master_gain: 0.3,
            storage_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        Ok(config.clamped())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Pull every value into its usable range
    pub fn clamped(mut self) -> Self {
        self.bpm = clamp_bpm(self.bpm);
        self.history_capacity = self.history_capacity.max(1);
        self.lookahead_ms = self.lookahead_ms.min(1000);
        self.master_gain = if self.master_gain.is_finite() {
            self.master_gain.clamp(0.0, 1.0)
        } else {
            0.3
        };
        self
    }

    pub fn knob_settle(&self) -> Duration {
        Duration::from_millis(self.knob_settle_ms)
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }
}

/// Tempo clamped to the supported range; NaN falls back to 120
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        120.0
    } else {
        bpm.clamp(MIN_BPM, MAX_BPM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = EngineConfig::from_toml_str("bpm = 138\nstorage_dir = \"/tmp/acid\"").unwrap();
        assert_eq!(config.bpm, 138.0);
        assert_eq!(config.history_capacity, 100);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/acid")));
        assert_eq!(config.knob_settle(), Duration::from_millis(250));
        assert_eq!(config.lookahead(), 0.04);
    }

    #[test]
    fn values_are_clamped() {
        let config = EngineConfig::from_toml_str("bpm = 5000\nhistory_capacity = 0\nmaster_gain = 4.0").unwrap();
        assert_eq!(config.bpm, MAX_BPM);
        assert_eq!(config.history_capacity, 1);
        assert_eq!(config.master_gain, 1.0);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("bpm = [").is_err());
        assert!(EngineConfig::from_toml_str("bpm = \"fast\"").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
