//! Application context: the one place the pattern, the transport and the
//! audio backend live together.
//!
//! Built once at startup and passed by reference to whatever drives it
//! (the terminal UI, a test, a batch command). Nothing in the crate keeps
//! global state.

use std::time::Instant;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::io::library::LibraryEntry;
use crate::runtime::track::TrackChain;
use crate::runtime::transport::{Mode, Tick, TickSource, Transport};
use crate::sequencing::chain::chain_at;
use crate::sequencing::notes::Note;
use crate::sequencing::pattern::Pattern;
use crate::sequencing::store::PatternStore;
use crate::synth::driver::{schedule_chain, schedule_preview};
use crate::synth::drums::DrumHit;
use crate::synth::message::AudioBackend;

/// Output side of the UI. Every method defaults to doing nothing.
pub trait UiSink {
    /// Step being played, `None` to clear the highlight
    fn highlight(&mut self, _step: Option<usize>, _at: f64) {}

    /// Start or stop the spectrum display
    fn visualizer(&mut self, _running: bool) {}

    /// Short non-blocking message for the user
    fn notice(&mut self, _text: &str) {}
}

/// Headless
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUi;

impl UiSink for NoUi {}

pub struct EngineContext<B: AudioBackend, U: UiSink = NoUi> {
    config: EngineConfig,
    store: PatternStore,
    transport: Transport,
    backend: B,
    ui: U,
}

impl<B: AudioBackend> EngineContext<B, NoUi> {
    pub fn new(config: EngineConfig, backend: B) -> Self {
        Self::with_ui(config, backend, NoUi)
    }
}

impl<B: AudioBackend, U: UiSink> EngineContext<B, U> {
    pub fn with_ui(config: EngineConfig, backend: B, ui: U) -> Self {
        let config = config.clamped();
        Self {
            store: PatternStore::new(config.history_capacity, config.knob_settle()),
            transport: Transport::new(config.bpm),
            config,
            backend,
            ui,
        }
    }

    /// Start editing `pattern` with an empty history
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.store = std::mem::take(&mut self.store).with_pattern(pattern);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PatternStore {
        &mut self.store
    }

    pub fn pattern(&self) -> &Pattern {
        self.store.pattern()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    /// Loop the edited pattern. Track playback is stopped first.
    pub fn play(&mut self) {
        self.halt();
        let now = self.backend.now();
        self.transport.play_single(now);
        self.ui.visualizer(true);
    }

    /// Play `chain` end to end. Single playback is stopped first.
    ///
    /// An empty chain is reported to the user and nothing changes.
    pub fn play_track(&mut self, chain: TrackChain) -> Result<()> {
        if chain.is_empty() {
            warn!("track playback requested with an empty chain");
            self.ui.notice("Track chain empty");
            return Err(Error::EmptyTrackChain);
        }
        self.halt();
        let now = self.backend.now();
        self.transport.play_track(chain, now)?;
        self.ui.visualizer(true);
        Ok(())
    }

    /// Build the chain from the selected library ids, then play it
    pub fn play_selection<S: AsRef<str>>(&mut self, selection: &[S], library: &[LibraryEntry]) -> Result<()> {
        self.play_track(TrackChain::from_library(selection, library))
    }

    /// Returns whether anything was playing
    pub fn stop(&mut self) -> bool {
        let stopped = self.halt();
        if stopped {
            self.ui.visualizer(false);
        }
        stopped
    }

    /// Stop and cut every sound at once, tails included
    pub fn silence(&mut self) {
        self.stop();
        self.backend.all_notes_off();
    }

    /// Change tempo; a playing transport restarts at step 0
    pub fn set_bpm(&mut self, bpm: f64) {
        let now = self.backend.now();
        if self.transport.set_bpm(bpm, now) {
            self.backend.cancel_after(now);
        }
        self.config.bpm = self.transport.bpm();
    }

    /// Schedule every step due within the lookahead window
    pub fn poll(&mut self) -> Vec<Tick> {
        let now = self.backend.now();
        let ticks = self
            .transport
            .poll(now, self.config.lookahead(), self.store.pattern().len());
        let step_duration = self.transport.step_duration();

        for tick in &ticks {
            if tick.overrun {
                warn!(step = tick.step, late_by = now - tick.at, "tick overrun, clock re-anchored");
            }
            let pattern = match tick.source {
                TickSource::Single => Some(self.store.pattern()),
                TickSource::Track(i) => self.transport.track().and_then(|t| t.get(i)),
            };
            if let Some(pattern) = pattern {
                dispatch_step(pattern, tick.step, tick.at, step_duration, &mut self.backend);
            }
            if self.transport.mode() == Mode::Single {
                self.ui.highlight(Some(tick.step), tick.at);
            }
        }
        ticks
    }

    /// Commit a settled knob gesture to history
    pub fn settle(&mut self, now: Instant) -> bool {
        self.store.settle(now)
    }

    /// Play a short audition of `raw` right now
    pub fn preview(&mut self, raw: &str) -> bool {
        let Some(note) = Note::normalize(raw) else {
            return false;
        };
        let pattern = self.store.pattern();
        let voice = schedule_preview(note, &pattern.knobs, pattern.waveform, self.backend.now());
        self.backend.schedule_voice(voice);
        true
    }

    /// Stop the transport and drop scheduled audio without touching the
    /// visualizer
    fn halt(&mut self) -> bool {
        if !self.transport.stop() {
            return false;
        }
        let now = self.backend.now();
        self.backend.cancel_after(now);
        self.ui.highlight(None, now);
        true
    }
}

/// Schedule what one step of `pattern` plays at `at`: the chain it starts
/// (if any) and its drum hits.
pub fn dispatch_step<B: AudioBackend + ?Sized>(
    pattern: &Pattern,
    step: usize,
    at: f64,
    step_duration: f64,
    backend: &mut B,
) {
    if let Some(chain) = chain_at(pattern.steps(), step) {
        debug!(step, len = chain.len(), accent = chain.accent(), "chain dispatched");
        backend.schedule_voice(schedule_chain(&chain, &pattern.knobs, pattern.waveform, at, step_duration));
    }
    for (instrument, volume) in pattern.drums().hits_at(step) {
        backend.trigger_drum(DrumHit { instrument, at, volume });
    }
}
