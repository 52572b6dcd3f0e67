//! Drum machine voices.
//!
//! Drums are not part of any chain. Each active lane cell fires one fixed
//! voice at the tick time, scaled by the lane volume.
//!
//! | instrument | source          | shaping                         | length |
//! | ---------- | --------------- | ------------------------------- | ------ |
//! | kick       | sine 150→50 Hz  | exp. pitch drop over 100 ms     | 300 ms |
//! | snare      | noise           | highpass 2 kHz                  | 150 ms |
//! | closed hat | noise           | highpass 7 kHz                  | 50 ms  |
//! | open hat   | noise           | highpass 7 kHz                  | 350 ms |
//! | clap       | noise           | bandpass 1.2 kHz, three bursts  | 200 ms |

use crate::dsp::filter::FilterType;
use crate::sequencing::pattern::DrumInstrument;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumHit {
    pub instrument: DrumInstrument,
    /// Seconds on the backend clock
    pub at: f64,
    /// Lane volume, 0..1
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrumSource {
    /// Sine with an exponential pitch drop
    Sine { from_hz: f32, to_hz: f32, sweep: f64 },
    /// Filtered white noise
    Noise { filter: FilterType, cutoff_hz: f32 },
}

/// Fixed recipe for one drum voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrumRecipe {
    pub source: DrumSource,
    /// Peak level before lane volume
    pub level: f32,
    /// Exponential decay time to silence, seconds
    pub decay: f64,
    /// Extra retriggers of the envelope, seconds after the hit (clap)
    pub bursts: &'static [f64],
}

impl DrumRecipe {
    pub fn for_instrument(instrument: DrumInstrument) -> Self {
        match instrument {
            DrumInstrument::Kick => DrumRecipe {
                source: DrumSource::Sine { from_hz: 150.0, to_hz: 50.0, sweep: 0.1 },
                level: 0.9,
                decay: 0.3,
                bursts: &[],
            },
            DrumInstrument::Snare => DrumRecipe {
                source: DrumSource::Noise { filter: FilterType::HighPass, cutoff_hz: 2000.0 },
                level: 0.5,
                decay: 0.15,
                bursts: &[],
            },
            DrumInstrument::ClosedHat => DrumRecipe {
                source: DrumSource::Noise { filter: FilterType::HighPass, cutoff_hz: 7000.0 },
                level: 0.3,
                decay: 0.05,
                bursts: &[],
            },
            DrumInstrument::OpenHat => DrumRecipe {
                source: DrumSource::Noise { filter: FilterType::HighPass, cutoff_hz: 7000.0 },
                level: 0.3,
                decay: 0.35,
                bursts: &[],
            },
            DrumInstrument::Clap => DrumRecipe {
                source: DrumSource::Noise { filter: FilterType::BandPass, cutoff_hz: 1200.0 },
                level: 0.6,
                decay: 0.2,
                bursts: &[0.01, 0.02],
            },
        }
    }

    /// Time from the hit until the voice is silent
    pub fn length(&self) -> f64 {
        self.bursts.iter().copied().fold(0.0, f64::max) + self.decay
    }

    /// Amplitude `t` seconds after the hit
    pub fn envelope(&self, t: f64) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        let since_trigger = self
            .bursts
            .iter()
            .copied()
            .filter(|b| *b <= t)
            .fold(t, |_, b| t - b);
        if since_trigger >= self.decay {
            return 0.0;
        }
        // Exponential from level down to 0.001 over `decay`
        let frac = (since_trigger / self.decay) as f32;
        self.level * 0.001f32.powf(frac)
    }

    /// Source frequency `t` seconds after the hit (sine sources only)
    pub fn frequency(&self, t: f64) -> f32 {
        match self.source {
            DrumSource::Sine { from_hz, to_hz, sweep } => {
                let frac = (t / sweep).clamp(0.0, 1.0) as f32;
                from_hz * (to_hz / from_hz).powf(frac)
            }
            DrumSource::Noise { .. } => 0.0,
        }
    }
}
