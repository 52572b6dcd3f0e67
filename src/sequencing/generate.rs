//! Scale-aware random basslines.
//!
//! Picks a scale and a base octave, then fills the grid: most steps get a
//! note from the scale, downbeats lean towards accents, and some notes slide.
//! Knobs, waveform and drums are left at their defaults.

use rand::seq::SliceRandom;
use rand::Rng;

use super::notes::{Note, PitchClass};
use super::pattern::{Pattern, Step};

/// Probability that a step carries a note
const NOTE_DENSITY: f64 = 0.7;
/// Probability that a note leaves the base octave
const OCTAVE_JUMP: f64 = 0.2;
const DOWNBEAT_ACCENT: f64 = 0.65;
const OFFBEAT_ACCENT: f64 = 0.15;
const SLIDE: f64 = 0.22;

/// Generated notes stay inside this octave window
const LOWEST_OCTAVE: i8 = 1;
const HIGHEST_OCTAVE: i8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Minor,
    Major,
    Phrygian,
    Blues,
}

impl Scale {
    pub const ALL: [Scale; 4] = [Scale::Minor, Scale::Major, Scale::Phrygian, Scale::Blues];

    /// Semitone offsets from C
    pub fn degrees(self) -> &'static [u8] {
        match self {
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
        }
    }
}

/// Random pattern over `pages` pages, scale chosen at random
pub fn random_pattern<R: Rng + ?Sized>(rng: &mut R, pages: usize) -> Pattern {
    let scale = *Scale::ALL.choose(rng).unwrap_or(&Scale::Minor);
    random_pattern_in(rng, scale, pages)
}

pub fn random_pattern_in<R: Rng + ?Sized>(rng: &mut R, scale: Scale, pages: usize) -> Pattern {
    let mut pattern = Pattern::with_pages(pages);
    let base_octave: i8 = if rng.gen_bool(0.5) { 2 } else { 3 };

    for i in 0..pattern.len() {
        let note = if rng.gen_bool(NOTE_DENSITY) {
            random_note(rng, scale, base_octave)
        } else {
            None
        };
        let accent = (i % 4 == 0 && rng.gen_bool(DOWNBEAT_ACCENT)) || rng.gen_bool(OFFBEAT_ACCENT);
        let slide = note.is_some() && rng.gen_bool(SLIDE);
        if let Some(step) = pattern.step_mut(i) {
            *step = Step {
                note,
                accent,
                slide,
                extend: false,
            };
        }
    }
    pattern
}

fn random_note<R: Rng + ?Sized>(rng: &mut R, scale: Scale, base_octave: i8) -> Option<Note> {
    let degree = *scale.degrees().choose(rng)?;
    let mut octave = base_octave;
    if rng.gen_bool(OCTAVE_JUMP) {
        octave += if rng.gen_bool(0.5) { -1 } else { 1 };
        octave = octave.clamp(LOWEST_OCTAVE, HIGHEST_OCTAVE);
    }
    Note::new(PitchClass::from_semitone(degree), octave)
}
