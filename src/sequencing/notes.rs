/*
Note Names
==========

Bassline notes are written the way a 303 owner writes them on paper:
a letter, an optional sharp, and an octave. The canonical form is

    <PitchClass>[#]-<octave>        e.g. "C-2", "F#-3", "A#-1"

Only sharps are stored. Flats are rewritten on input through a fixed table,
and the two "white key sharps" collapse onto their neighbours:

    Ab -> G#   Bb -> A#   Cb -> B    Db -> C#
    Eb -> D#   Fb -> E    Gb -> F#
    E# -> F    B# -> C

The written octave is kept as-is through those rewrites (so "Cb-2" becomes
"B-2", not "B-1"). Sequencer patterns only use octaves 1 through 4.

MIDI / Frequency
----------------

    midi = (octave + 1) * 12 + semitone        C=0, C#=1, ... B=11
    freq = 440 * 2^((midi - 69) / 12)          A-4 = MIDI 69 = 440 Hz

Parsing is total: anything that does not look like a note yields `None`.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lowest octave the sequencer accepts
pub const MIN_OCTAVE: i8 = 1;
/// Highest octave the sequencer accepts
pub const MAX_OCTAVE: i8 = 4;

/// A4 tuning reference
pub const A4_HZ: f64 = 440.0;
pub const A4_MIDI: u8 = 69;

/// The twelve sharp-spelled pitch classes, in semitone order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitone offset above C
    pub fn semitone(self) -> u8 {
        self as u8
    }

    pub fn from_semitone(semitone: u8) -> Self {
        Self::ALL[(semitone % 12) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Letter + accidental to a canonical pitch class.
    ///
    /// `letter` must already be uppercase A..G.
    fn spell(letter: u8, accidental: Accidental) -> Option<Self> {
        use PitchClass::*;
        let natural = match letter {
            b'C' => C,
            b'D' => D,
            b'E' => E,
            b'F' => F,
            b'G' => G,
            b'A' => A,
            b'B' => B,
            _ => return None,
        };
        let pc = match (natural, accidental) {
            (pc, Accidental::Natural) => pc,
            // White key sharps collapse to the next natural
            (E, Accidental::Sharp) => F,
            (B, Accidental::Sharp) => C,
            (pc, Accidental::Sharp) => Self::from_semitone(pc.semitone() + 1),
            // Fixed flat table; Cb and Fb land on naturals
            (C, Accidental::Flat) => B,
            (F, Accidental::Flat) => E,
            (pc, Accidental::Flat) => Self::from_semitone(pc.semitone() + 11),
        };
        Some(pc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accidental {
    Natural,
    Sharp,
    Flat,
}

/// A pitch in the sequencer's range (octaves 1-4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note {
    octave: i8,
    pitch: PitchClass,
}

impl Note {
    /// Build a note, rejecting octaves outside the sequencer range
    pub fn new(pitch: PitchClass, octave: i8) -> Option<Self> {
        (MIN_OCTAVE..=MAX_OCTAVE)
            .contains(&octave)
            .then_some(Self { octave, pitch })
    }

    pub fn pitch(&self) -> PitchClass {
        self.pitch
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// Parse loosely-written input into a canonical note.
    ///
    /// Strips whitespace, accepts `♭`/`♯`, lowercase letters and `-`/`_`
    /// separators. Returns `None` for anything unparsable.
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '♭' => 'b',
                '♯' => '#',
                other => other,
            })
            .collect();

        let bytes = cleaned.as_bytes();
        let (&letter, mut rest) = bytes.split_first()?;
        let letter = letter.to_ascii_uppercase();
        if !(b'A'..=b'G').contains(&letter) {
            return None;
        }

        let accidental = match rest.first() {
            Some(b'#') => {
                rest = &rest[1..];
                Accidental::Sharp
            }
            Some(b'b') => {
                rest = &rest[1..];
                Accidental::Flat
            }
            _ => Accidental::Natural,
        };

        // Optional separator, then an optionally negative single digit
        if let Some(b'-' | b'_') = rest.first() {
            if rest.len() > 1 {
                rest = &rest[1..];
            }
        }
        let octave = match rest {
            [d] if d.is_ascii_digit() => (d - b'0') as i8,
            [b'-', d] if d.is_ascii_digit() => -((d - b'0') as i8),
            _ => return None,
        };

        Note::new(PitchClass::spell(letter, accidental)?, octave)
    }

    /// MIDI note number
    pub fn midi(&self) -> u8 {
        ((self.octave as i16 + 1) * 12 + self.pitch.semitone() as i16) as u8
    }

    /// Build from a MIDI note number, if it falls inside the sequencer range
    pub fn from_midi(midi: u8) -> Option<Self> {
        let octave = (midi / 12) as i8 - 1;
        Note::new(PitchClass::from_semitone(midi % 12), octave)
    }

    /// Equal-tempered frequency in Hz referenced to A4 = 440 Hz
    pub fn frequency(&self) -> f64 {
        midi_to_freq(self.midi())
    }
}

/// Equal-tempered frequency for a MIDI note number
pub fn midi_to_freq(midi: u8) -> f64 {
    A4_HZ * 2.0_f64.powf((midi as f64 - A4_MIDI as f64) / 12.0)
}

/// Every note the grid offers, C-1 up to and including C-4
pub fn note_range() -> impl DoubleEndedIterator<Item = Note> {
    let low = Note { octave: MIN_OCTAVE, pitch: PitchClass::C }.midi();
    let high = Note { octave: MAX_OCTAVE, pitch: PitchClass::C }.midi();
    (low..=high).filter_map(Note::from_midi)
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pitch.name(), self.octave)
    }
}

/// Strict parse: the input must normalize to a note
impl FromStr for Note {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Note::normalize(s).ok_or_else(|| format!("not a note: {s:?}"))
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
