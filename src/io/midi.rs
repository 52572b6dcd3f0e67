//! Standard MIDI File export of a single pattern.
//!
//! Format 0, one track, 480 ticks per quarter note. Every step is a
//! sixteenth (120 ticks). A step with its own note (and no extend flag) plays
//! for exactly one step; rests and extends only advance time.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::sequencing::duration::{Duration, PPQ};
use crate::sequencing::pattern::Pattern;

pub const ACCENT_VELOCITY: u8 = 110;
pub const NORMAL_VELOCITY: u8 = 80;
const CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    /// Microseconds per quarter note
    Tempo { micros_per_quarter: u32 },
    EndOfTrack,
}

impl MidiEvent {
    fn write(&self, out: &mut Vec<u8>) {
        match *self {
            MidiEvent::NoteOn { channel, key, velocity } => {
                out.extend_from_slice(&[0x90 | (channel & 0x0f), key & 0x7f, velocity & 0x7f]);
            }
            MidiEvent::NoteOff { channel, key, velocity } => {
                out.extend_from_slice(&[0x80 | (channel & 0x0f), key & 0x7f, velocity & 0x7f]);
            }
            MidiEvent::Tempo { micros_per_quarter } => {
                let [_, a, b, c] = micros_per_quarter.min(0xff_ffff).to_be_bytes();
                out.extend_from_slice(&[0xff, 0x51, 0x03, a, b, c]);
            }
            MidiEvent::EndOfTrack => out.extend_from_slice(&[0xff, 0x2f, 0x00]),
        }
    }
}

/// (delta ticks, event) pairs for one pattern
pub fn pattern_events(pattern: &Pattern, bpm: f64) -> Vec<(u32, MidiEvent)> {
    let step_ticks = Duration::SIXTEENTH.to_ticks(PPQ);
    let mut events = vec![(0, MidiEvent::Tempo { micros_per_quarter: micros_per_quarter(bpm) })];
    let mut pending = 0;

    for step in pattern.steps() {
        match step.note {
            Some(note) if !step.extend => {
                let key = note.midi();
                let velocity = if step.accent { ACCENT_VELOCITY } else { NORMAL_VELOCITY };
                events.push((pending, MidiEvent::NoteOn { channel: CHANNEL, key, velocity }));
                events.push((step_ticks, MidiEvent::NoteOff { channel: CHANNEL, key, velocity: 0 }));
                pending = 0;
            }
            _ => pending += step_ticks,
        }
    }

    events.push((pending, MidiEvent::EndOfTrack));
    events
}

/// Encode the pattern as SMF bytes
pub fn export_pattern(pattern: &Pattern, bpm: f64) -> Vec<u8> {
    let mut track = Vec::new();
    for (delta, event) in pattern_events(pattern, bpm) {
        write_var_len(delta, &mut track);
        event.write(&mut track);
    }

    let mut bytes = Vec::with_capacity(22 + track.len());
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes()); // format 0
    bytes.extend_from_slice(&1u16.to_be_bytes()); // one track
    bytes.extend_from_slice(&(PPQ as u16).to_be_bytes());
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&track);
    bytes
}

pub fn write_pattern(pattern: &Pattern, bpm: f64, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, export_pattern(pattern, bpm))?;
    Ok(())
}

fn micros_per_quarter(bpm: f64) -> u32 {
    let bpm = crate::config::clamp_bpm(bpm);
    (60_000_000.0 / bpm).round() as u32
}

/// MIDI variable-length quantity, most significant group first
fn write_var_len(mut value: u32, out: &mut Vec<u8>) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::notes::Note;

    fn var_len(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_var_len(value, &mut out);
        out
    }

    #[test]
    fn variable_length_quantities() {
        assert_eq!(var_len(0), [0x00]);
        assert_eq!(var_len(0x7f), [0x7f]);
        assert_eq!(var_len(120), [0x78]);
        assert_eq!(var_len(0x80), [0x81, 0x00]);
        assert_eq!(var_len(1920), [0x8f, 0x00]);
        assert_eq!(var_len(0x0fff_ffff), [0xff, 0xff, 0xff, 0x7f]);
    }

    #[test]
    fn header_and_tempo() {
        let bytes = export_pattern(&Pattern::default(), 120.0);
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[8..14], &[0, 0, 0, 1, 0x01, 0xe0]);
        assert_eq!(&bytes[14..18], b"MTrk");
        let len = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]) as usize;
        assert_eq!(bytes.len(), 22 + len);
        // 500_000 us per quarter at 120 BPM
        assert_eq!(&bytes[22..29], &[0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20]);
        assert_eq!(&bytes[bytes.len() - 3..], &[0xff, 0x2f, 0x00]);
    }

    #[test]
    fn notes_rests_and_extends() {
        let mut pattern = Pattern::default();
        let c2 = Note::normalize("C-2").unwrap();
        pattern.step_mut(0).unwrap().note = Some(c2);
        pattern.step_mut(0).unwrap().accent = true;
        pattern.step_mut(1).unwrap().extend = true;
        pattern.step_mut(3).unwrap().note = Note::normalize("D-2");

        let events = pattern_events(&pattern, 120.0);
        assert_eq!(events[1], (0, MidiEvent::NoteOn { channel: 0, key: c2.midi(), velocity: 110 }));
        assert_eq!(events[2], (120, MidiEvent::NoteOff { channel: 0, key: c2.midi(), velocity: 0 }));
        // Extend and rest at steps 1..3 push the next note 240 ticks later
        assert_eq!(events[3].0, 240);
        assert!(matches!(events[3].1, MidiEvent::NoteOn { velocity: 80, .. }));
        // 12 silent steps before the end of the track
        assert_eq!(events.last(), Some(&(12 * 120, MidiEvent::EndOfTrack)));
    }

    #[test]
    fn export_does_not_touch_pattern() {
        let mut pattern = Pattern::with_pages(2);
        pattern.step_mut(20).unwrap().note = Note::normalize("A-3");
        let before = pattern.clone();
        let _ = export_pattern(&pattern, 133.0);
        assert_eq!(pattern, before);
    }
}
