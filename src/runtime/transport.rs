//! Transport: the play / stop state machine.
//!
//! Exactly one of three states is live at a time, so single-pattern and
//! track playback can never tick together. Each playing state owns its own
//! [`TickClock`]; stopping drops it, which is what guarantees no tick fires
//! after a stop.

use tracing::{debug, info};

use crate::config::clamp_bpm;
use crate::error::{Error, Result};
use crate::runtime::clock::{ClockTick, TickClock};
use crate::runtime::track::TrackChain;
use crate::sequencing::duration::Duration;
use crate::sequencing::pattern::STEPS_PER_PAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stopped,
    Single,
    Track,
}

/// Which pattern a tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// The pattern being edited
    Single,
    /// Index into the track chain
    Track(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub source: TickSource,
    /// Backend clock time the step starts at
    pub at: f64,
    pub overrun: bool,
}

#[derive(Debug, Clone)]
enum State {
    Stopped,
    Single {
        cursor: usize,
        clock: TickClock,
    },
    Track {
        cursor: usize,
        pattern_index: usize,
        chain: TrackChain,
        clock: TickClock,
    },
}

#[derive(Debug, Clone)]
pub struct Transport {
    bpm: f64,
    state: State,
}

impl Transport {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: clamp_bpm(bpm),
            state: State::Stopped,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// One sixteenth at the current tempo, seconds
    pub fn step_duration(&self) -> f64 {
        Duration::SIXTEENTH.to_seconds(self.bpm)
    }

    pub fn mode(&self) -> Mode {
        match self.state {
            State::Stopped => Mode::Stopped,
            State::Single { .. } => Mode::Single,
            State::Track { .. } => Mode::Track,
        }
    }

    /// Step the next tick will play
    pub fn cursor(&self) -> Option<usize> {
        match &self.state {
            State::Stopped => None,
            State::Single { cursor, .. } | State::Track { cursor, .. } => Some(*cursor),
        }
    }

    /// The chain being played in track mode
    pub fn track(&self) -> Option<&TrackChain> {
        match &self.state {
            State::Track { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// Loop the edited pattern from step 0, replacing whatever was playing
    pub fn play_single(&mut self, now: f64) {
        self.state = State::Single {
            cursor: 0,
            clock: TickClock::new(self.step_duration(), now),
        };
        info!(bpm = self.bpm, "single playback started");
    }

    /// Play `chain` end to end from its first pattern.
    ///
    /// An empty chain is refused and the current state is left alone.
    pub fn play_track(&mut self, chain: TrackChain, now: f64) -> Result<()> {
        if chain.is_empty() {
            return Err(Error::EmptyTrackChain);
        }
        info!(bpm = self.bpm, patterns = chain.len(), "track playback started");
        self.state = State::Track {
            cursor: 0,
            pattern_index: 0,
            chain,
            clock: TickClock::new(self.step_duration(), now),
        };
        Ok(())
    }

    /// Returns whether anything was playing
    pub fn stop(&mut self) -> bool {
        let was = self.mode();
        self.state = State::Stopped;
        if was != Mode::Stopped {
            info!(mode = ?was, "playback stopped");
        }
        was != Mode::Stopped
    }

    /// Change tempo. A playing transport restarts from step 0 in the same
    /// mode so every scheduled tick uses one step length. Returns whether a
    /// restart happened.
    pub fn set_bpm(&mut self, bpm: f64, now: f64) -> bool {
        let bpm = clamp_bpm(bpm);
        if bpm == self.bpm {
            return false;
        }
        self.bpm = bpm;
        let step = self.step_duration();
        match &mut self.state {
            State::Stopped => false,
            State::Single { cursor, clock } => {
                *cursor = 0;
                *clock = TickClock::new(step, now);
                info!(bpm, "tempo changed, single playback restarted");
                true
            }
            State::Track {
                cursor,
                pattern_index,
                clock,
                ..
            } => {
                *cursor = 0;
                *pattern_index = 0;
                *clock = TickClock::new(step, now);
                info!(bpm, "tempo changed, track playback restarted");
                true
            }
        }
    }

    /// Ticks due by `now + lookahead`, cursor advanced past each.
    ///
    /// `single_len` is the edited pattern's length; track mode uses the
    /// length of whichever chained pattern is current.
    pub fn poll(&mut self, now: f64, lookahead: f64, single_len: usize) -> Vec<Tick> {
        let mut due: Vec<ClockTick> = Vec::new();
        match &mut self.state {
            State::Stopped => Vec::new(),
            State::Single { cursor, clock } => {
                clock.due(now, lookahead, &mut due);
                let len = single_len.max(1);
                due.into_iter()
                    .map(|t| {
                        let step = *cursor % len;
                        *cursor = (step + 1) % len;
                        Tick {
                            step,
                            source: TickSource::Single,
                            at: t.at,
                            overrun: t.overrun,
                        }
                    })
                    .collect()
            }
            State::Track {
                cursor,
                pattern_index,
                chain,
                clock,
            } => {
                clock.due(now, lookahead, &mut due);
                due.into_iter()
                    .map(|t| {
                        let lap = chain
                            .get(*pattern_index)
                            .map_or(STEPS_PER_PAGE, |p| p.len().max(1));
                        let tick = Tick {
                            step: *cursor,
                            source: TickSource::Track(*pattern_index),
                            at: t.at,
                            overrun: t.overrun,
                        };
                        *cursor += 1;
                        if *cursor >= lap {
                            *cursor = 0;
                            *pattern_index = (*pattern_index + 1) % chain.len().max(1);
                            debug!(pattern = *pattern_index, "track advanced");
                        }
                        tick
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::pattern::Pattern;
    use approx::assert_relative_eq;

    fn steps(ticks: &[Tick]) -> Vec<usize> {
        ticks.iter().map(|t| t.step).collect()
    }

    #[test]
    fn step_duration_is_a_sixteenth() {
        assert_relative_eq!(Transport::new(120.0).step_duration(), 0.125);
        assert_relative_eq!(Transport::new(140.0).step_duration(), 60.0 / 140.0 / 4.0);
    }

    #[test]
    fn stopped_transport_emits_nothing() {
        let mut transport = Transport::new(120.0);
        assert!(transport.poll(10.0, 1.0, 16).is_empty());
        assert!(!transport.stop());
    }

    #[test]
    fn single_mode_wraps() {
        let mut transport = Transport::new(120.0);
        transport.play_single(0.0);
        // 17 ticks: 0..=2.0 at 0.125 s spacing
        let ticks = transport.poll(2.0, 0.0, 16);
        assert_eq!(ticks.len(), 17);
        assert_eq!(ticks[15].step, 15);
        assert_eq!(ticks[16].step, 0);
        assert!(ticks.iter().all(|t| t.source == TickSource::Single));
        assert_relative_eq!(ticks[3].at, 0.375);
    }

    #[test]
    fn single_mode_follows_pattern_length() {
        let mut transport = Transport::new(120.0);
        transport.play_single(0.0);
        transport.poll(0.0, 0.5, 32);
        assert_eq!(transport.cursor(), Some(5));
        // Shrunk to 4 steps while playing
        let ticks = transport.poll(0.625, 0.0, 4);
        assert_eq!(steps(&ticks), [1]);
    }

    #[test]
    fn empty_track_is_refused_without_changing_state() {
        let mut transport = Transport::new(120.0);
        transport.play_single(0.0);
        let err = transport.play_track(TrackChain::default(), 0.0).unwrap_err();
        assert!(matches!(err, Error::EmptyTrackChain));
        assert_eq!(transport.mode(), Mode::Single);
    }

    #[test]
    fn modes_are_exclusive() {
        let mut transport = Transport::new(120.0);
        transport.play_single(0.0);
        transport.play_track(TrackChain::from_patterns([Pattern::default()]), 1.0).unwrap();
        assert_eq!(transport.mode(), Mode::Track);
        let ticks = transport.poll(1.0, 0.0, 16);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].source, TickSource::Track(0));

        transport.play_single(2.0);
        assert_eq!(transport.mode(), Mode::Single);
        assert!(transport.track().is_none());
    }

    #[test]
    fn track_advances_after_each_lap() {
        let chain = TrackChain::from_patterns([Pattern::with_pages(1), Pattern::with_pages(2)]);
        let mut transport = Transport::new(120.0);
        transport.play_track(chain, 0.0).unwrap();

        // 16 + 32 + 1 ticks
        let ticks = transport.poll(48.0 * 0.125, 0.0, 16);
        assert_eq!(ticks.len(), 49);
        assert_eq!(ticks[15].source, TickSource::Track(0));
        assert_eq!(ticks[16].source, TickSource::Track(1));
        assert_eq!(ticks[16].step, 0);
        assert_eq!(ticks[47].step, 31);
        assert_eq!(ticks[48].source, TickSource::Track(0));
    }

    #[test]
    fn bpm_change_restarts_playing_transport() {
        let mut transport = Transport::new(120.0);
        assert!(!transport.set_bpm(130.0, 0.0));

        transport.play_single(0.0);
        transport.poll(0.5, 0.0, 16);
        assert!(transport.set_bpm(150.0, 0.6));
        assert_eq!(transport.cursor(), Some(0));
        let ticks = transport.poll(0.6, 0.05, 16);
        assert_eq!(steps(&ticks), [0]);
        assert_relative_eq!(ticks[0].at, 0.6);
        // Same tempo again is not a restart
        assert!(!transport.set_bpm(150.0, 1.0));
    }

    #[test]
    fn tempo_is_clamped() {
        let mut transport = Transport::new(1000.0);
        assert_eq!(transport.bpm(), 300.0);
        transport.set_bpm(f64::NAN, 0.0);
        assert_eq!(transport.bpm(), 120.0);
    }

    #[test]
    fn stop_cancels_future_ticks() {
        let mut transport = Transport::new(120.0);
        transport.play_single(0.0);
        transport.poll(0.0, 0.0, 16);
        assert!(transport.stop());
        assert!(transport.poll(5.0, 1.0, 16).is_empty());
        assert_eq!(transport.cursor(), None);
    }
}
