//! The seam between the sequencer and whatever makes sound.
//!
//! The transport never calls into audio code synchronously. It hands
//! timestamped work to an [`AudioBackend`]; the backend owns the clock those
//! timestamps refer to. The real-time backend pushes [`SynthMessage`]s through
//! an `rtrb` ring buffer to the audio thread, which drains them with
//! [`MessageReceiver`].

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};
#[cfg(feature = "rtrb")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "rtrb")]
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "rtrb")]
use tracing::warn;

use super::driver::VoiceSchedule;
use super::drums::DrumHit;

#[derive(Debug, Clone)]
pub enum SynthMessage {
    Voice(Box<VoiceSchedule>),
    Drum(DrumHit),
    /// Drop everything that starts after this time
    CancelAfter(f64),
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Where scheduled voices and drum hits go
pub trait AudioBackend {
    /// Current time on the backend clock, seconds
    fn now(&self) -> f64;

    fn schedule_voice(&mut self, voice: VoiceSchedule);

    fn trigger_drum(&mut self, hit: DrumHit);

    /// Cancel voices and hits that have not started by `at`
    fn cancel_after(&mut self, at: f64);

    /// Cut every voice and hit, sounding or scheduled
    fn all_notes_off(&mut self);
}

/// Discards everything. Used when no audio device is available.
#[derive(Debug, Clone)]
pub struct NullBackend {
    epoch: Instant,
}

impl Default for NullBackend {
    fn default() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl AudioBackend for NullBackend {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn schedule_voice(&mut self, _voice: VoiceSchedule) {}

    fn trigger_drum(&mut self, _hit: DrumHit) {}

    fn cancel_after(&mut self, _at: f64) {}

    fn all_notes_off(&mut self) {}
}

/// Keeps every message and runs on a hand-driven clock
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    now: f64,
    pub messages: Vec<SynthMessage>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }

    pub fn voices(&self) -> impl Iterator<Item = &VoiceSchedule> + '_ {
        self.messages.iter().filter_map(|m| match m {
            SynthMessage::Voice(v) => Some(v.as_ref()),
            _ => None,
        })
    }

    pub fn drums(&self) -> impl Iterator<Item = &DrumHit> + '_ {
        self.messages.iter().filter_map(|m| match m {
            SynthMessage::Drum(hit) => Some(hit),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl AudioBackend for RecordingBackend {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule_voice(&mut self, voice: VoiceSchedule) {
        self.messages.push(SynthMessage::Voice(Box::new(voice)));
    }

    fn trigger_drum(&mut self, hit: DrumHit) {
        self.messages.push(SynthMessage::Drum(hit));
    }

    fn cancel_after(&mut self, at: f64) {
        self.messages.push(SynthMessage::CancelAfter(at));
    }

    fn all_notes_off(&mut self) {
        self.messages.push(SynthMessage::AllNotesOff);
    }
}

/// Sample counter written by the audio thread, read as the backend clock
#[cfg(feature = "rtrb")]
#[derive(Debug, Clone)]
pub struct SampleClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

#[cfg(feature = "rtrb")]
impl SampleClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Called by the audio thread after each rendered block
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }
}

/// Real-time backend: messages go to the audio thread over a ring buffer
#[cfg(feature = "rtrb")]
pub struct RingBackend {
    producer: Producer<SynthMessage>,
    clock: SampleClock,
}

#[cfg(feature = "rtrb")]
impl RingBackend {
    pub fn new(producer: Producer<SynthMessage>, clock: SampleClock) -> Self {
        Self { producer, clock }
    }

    fn send(&mut self, message: SynthMessage) {
        if self.producer.push(message).is_err() {
            warn!("audio queue full, dropping message");
        }
    }
}

#[cfg(feature = "rtrb")]
impl AudioBackend for RingBackend {
    fn now(&self) -> f64 {
        self.clock.seconds()
    }

    fn schedule_voice(&mut self, voice: VoiceSchedule) {
        self.send(SynthMessage::Voice(Box::new(voice)));
    }

    fn trigger_drum(&mut self, hit: DrumHit) {
        self.send(SynthMessage::Drum(hit));
    }

    fn cancel_after(&mut self, at: f64) {
        self.send(SynthMessage::CancelAfter(at));
    }

    fn all_notes_off(&mut self) {
        self.send(SynthMessage::AllNotesOff);
    }
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn schedule_voice(&mut self, voice: VoiceSchedule) {
        (**self).schedule_voice(voice)
    }

    fn trigger_drum(&mut self, hit: DrumHit) {
        (**self).trigger_drum(hit)
    }

    fn cancel_after(&mut self, at: f64) {
        (**self).cancel_after(at)
    }

    fn all_notes_off(&mut self) {
        (**self).all_notes_off()
    }
}

#[cfg(all(test, feature = "rtrb"))]
mod tests {
    use super::*;
    use crate::sequencing::pattern::DrumInstrument;

    #[test]
    fn ring_backend_delivers_in_order() {
        let (producer, mut consumer) = rtrb::RingBuffer::new(4);
        let clock = SampleClock::new(48_000.0);
        let mut backend = RingBackend::new(producer, clock.clone());

        clock.advance(24_000);
        assert_eq!(backend.now(), 0.5);

        backend.trigger_drum(DrumHit { instrument: DrumInstrument::Kick, at: 0.5, volume: 1.0 });
        backend.cancel_after(0.6);

        assert!(matches!(MessageReceiver::pop(&mut consumer), Some(SynthMessage::Drum(_))));
        assert!(matches!(MessageReceiver::pop(&mut consumer), Some(SynthMessage::CancelAfter(t)) if t == 0.6));
        assert!(MessageReceiver::pop(&mut consumer).is_none());
    }

    #[test]
    fn full_ring_drops_without_panicking() {
        let (producer, _consumer) = rtrb::RingBuffer::new(1);
        let mut backend = RingBackend::new(producer, SampleClock::new(48_000.0));
        backend.cancel_after(0.0);
        backend.cancel_after(1.0);
    }
}
