//! Playback runtime.
//!
//! The [`Transport`] decides which steps are due and when, the
//! [`EngineContext`] turns those ticks into scheduled voices and drum hits
//! on an [`AudioBackend`](crate::synth::AudioBackend).
//!
//! ```ignore
//! use acidstep::{config::EngineConfig, runtime::EngineContext, synth::NullBackend};
//!
//! let mut ctx = EngineContext::new(EngineConfig::default(), NullBackend::default());
//! ctx.store_mut().toggle_note(0, "C-2");
//! ctx.play();
//! loop {
//!     ctx.poll();
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! ```

pub mod clock;
pub mod context;
pub mod track;
pub mod transport;

pub use clock::{ClockTick, TickClock};
pub use context::{dispatch_step, EngineContext, NoUi, UiSink};
pub use track::TrackChain;
pub use transport::{Mode, Tick, TickSource, Transport};
