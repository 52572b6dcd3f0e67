// Purpose: turn resolved chains and drum cells into sound
// The driver produces timestamped schedules; backends deliver them; the
// renderer plays them on the audio thread.

pub mod driver;
pub mod drums;
pub mod message;
pub mod renderer;

pub use driver::{schedule_chain, schedule_preview, ParamEvent, ParamTarget, Shaper, VoiceSchedule};
pub use drums::{DrumHit, DrumRecipe};
#[cfg(feature = "rtrb")]
pub use message::{RingBackend, SampleClock};
pub use message::{AudioBackend, MessageReceiver, NullBackend, RecordingBackend, SynthMessage};
pub use renderer::Renderer;
