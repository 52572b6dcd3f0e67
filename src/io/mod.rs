// Purpose - getting patterns in and out: storage, MIDI files, TD-3 sheets

pub mod library;
pub mod midi;
pub mod sheet;

pub use library::{Fallback, JsonFileStorage, Library, LibraryEntry, MemoryStorage, Preset, Storage};
pub use midi::{export_pattern, MidiEvent};
pub use sheet::{Td3Sheet, TrackSheet};
