pub mod chain;
pub mod duration;
pub mod generate;
pub mod history;
pub mod notes;
pub mod pattern;
pub mod store;

pub use chain::{chain_at, is_chain_starter, resolve, Chain, ChainStep, Link};
pub use duration::Duration;
pub use notes::{Note, PitchClass};
pub use pattern::{
    DrumInstrument, DrumLane, Drums, KnobKey, Knobs, Pattern, Step, StepFlag, Waveform,
    MAX_PAGES, STEPS_PER_PAGE,
};
pub use store::PatternStore;
