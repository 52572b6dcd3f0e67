//! TD-3 programming sheet.
//!
//! The hardware is programmed in two passes: pitch mode takes the notes in
//! order (no rests, no ties), time mode takes one of note / tie / rest per
//! step. The sheet lists both plus the keyboard and transpose needed for each
//! distinct note.

use std::fmt;

use crate::runtime::track::TrackChain;
use crate::sequencing::notes::{Note, PitchClass};
use crate::sequencing::pattern::Pattern;

/// Octave played without transpose
const HOME_OCTAVE: i8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    Down,
    None,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMapping {
    pub note: Note,
    pub key: PitchClass,
    pub transpose: Transpose,
}

impl KeyMapping {
    pub fn for_note(note: Note) -> Self {
        let transpose = match note.octave().cmp(&HOME_OCTAVE) {
            std::cmp::Ordering::Less => Transpose::Down,
            std::cmp::Ordering::Equal => Transpose::None,
            std::cmp::Ordering::Greater => Transpose::Up,
        };
        Self { note, key: note.pitch(), transpose }
    }
}

impl fmt::Display for KeyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transpose {
            Transpose::None => write!(f, "{} -> key [{}]", self.note, self.key.name()),
            Transpose::Up => write!(f, "{} -> [Transpose UP] + key [{}]", self.note, self.key.name()),
            Transpose::Down => write!(f, "{} -> [Transpose DOWN] + key [{}]", self.note, self.key.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEntry {
    /// A new note, one sixteenth
    Note,
    /// Tie to the previous note
    Ext,
    Rest,
}

impl TimeEntry {
    pub fn label(self) -> &'static str {
        match self {
            TimeEntry::Note => "16th",
            TimeEntry::Ext => "EXT",
            TimeEntry::Rest => "REST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based, as printed on the hardware
    pub step: usize,
    /// For a tie this is the note being held
    pub note: Option<Note>,
    pub time: TimeEntry,
    pub accent: bool,
    pub slide: bool,
}

impl SheetRow {
    pub fn flags(&self) -> String {
        match (self.accent, self.slide) {
            (true, true) => "ACC SLIDE".to_string(),
            (true, false) => "ACC".to_string(),
            (false, true) => "SLIDE".to_string(),
            (false, false) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Td3Sheet {
    /// Pitch-mode entry order, repeats included
    pub notes: Vec<Note>,
    /// One mapping per distinct note, first appearance first
    pub keys: Vec<KeyMapping>,
    pub rows: Vec<SheetRow>,
}

impl Td3Sheet {
    pub fn build(pattern: &Pattern) -> Self {
        let mut notes = Vec::new();
        let mut keys: Vec<KeyMapping> = Vec::new();
        let mut rows = Vec::with_capacity(pattern.len());
        let mut last_real = None;

        for (i, step) in pattern.steps().iter().enumerate() {
            let (note, time) = if step.extend {
                (last_real, TimeEntry::Ext)
            } else if let Some(note) = step.note {
                notes.push(note);
                if !keys.iter().any(|k| k.note == note) {
                    keys.push(KeyMapping::for_note(note));
                }
                last_real = Some(note);
                (Some(note), TimeEntry::Note)
            } else {
                (None, TimeEntry::Rest)
            };
            rows.push(SheetRow {
                step: i + 1,
                note,
                time,
                accent: step.accent,
                slide: step.slide,
            });
        }

        Self { notes, keys, rows }
    }
}

impl fmt::Display for Td3Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PITCH MODE: enter the notes in order")?;
        if self.notes.is_empty() {
            writeln!(f, "  (no notes)")?;
        } else {
            let list: Vec<String> = self.notes.iter().map(Note::to_string).collect();
            writeln!(f, "  {}", list.join(", "))?;
        }

        writeln!(f)?;
        writeln!(f, "Keys and transpose")?;
        if self.keys.is_empty() {
            writeln!(f, "  (no notes in this pattern)")?;
        }
        for key in &self.keys {
            writeln!(f, "  {key}")?;
        }

        writeln!(f)?;
        writeln!(f, "TIME MODE, then ACCENT / SLIDE per step")?;
        writeln!(f, "{:>4}  {:<5} {:<5} Flags", "Step", "Note", "Time")?;
        for row in &self.rows {
            let note = row.note.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            writeln!(f, "{:>4}  {:<5} {:<5} {}", row.step, note, row.time.label(), row.flags())?;
        }
        Ok(())
    }
}

/// One titled sheet per pattern of a track chain, in play order
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSheet {
    pub sheets: Vec<(String, Td3Sheet)>,
}

impl TrackSheet {
    pub fn build(chain: &TrackChain) -> Self {
        let sheets = chain
            .patterns()
            .iter()
            .enumerate()
            .map(|(i, pattern)| (format!("Track Pattern {}", i + 1), Td3Sheet::build(pattern)))
            .collect();
        Self { sheets }
    }
}

impl fmt::Display for TrackSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (title, sheet)) in self.sheets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "=== {title} ===")?;
            write!(f, "{sheet}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> Note {
        Note::normalize(s).unwrap()
    }

    fn pattern() -> Pattern {
        let mut p = Pattern::default();
        let edits: [(usize, &str); 4] = [(0, "C-2"), (2, "D#-3"), (3, "C-2"), (5, "G-1")];
        for (i, n) in edits {
            p.step_mut(i).unwrap().note = Some(note(n));
        }
        p.step_mut(0).unwrap().accent = true;
        p.step_mut(2).unwrap().slide = true;
        p.step_mut(4).unwrap().extend = true;
        p
    }

    #[test]
    fn pitch_order_keeps_repeats() {
        let sheet = Td3Sheet::build(&pattern());
        assert_eq!(sheet.notes, [note("C-2"), note("D#-3"), note("C-2"), note("G-1")]);
        assert_eq!(sheet.keys.len(), 3);
    }

    #[test]
    fn transpose_mapping() {
        let sheet = Td3Sheet::build(&pattern());
        let transposes: Vec<Transpose> = sheet.keys.iter().map(|k| k.transpose).collect();
        assert_eq!(transposes, [Transpose::None, Transpose::Up, Transpose::Down]);
        assert_eq!(sheet.keys[1].to_string(), "D#-3 -> [Transpose UP] + key [D#]");
    }

    #[test]
    fn rows_show_time_and_held_note() {
        let sheet = Td3Sheet::build(&pattern());
        assert_eq!(sheet.rows.len(), 16);
        assert_eq!(sheet.rows[0].time, TimeEntry::Note);
        assert_eq!(sheet.rows[0].flags(), "ACC");
        assert_eq!(sheet.rows[1].time, TimeEntry::Rest);
        assert_eq!(sheet.rows[1].note, None);
        assert_eq!(sheet.rows[2].flags(), "SLIDE");
        // Tie after C-2 at step 4 holds C-2
        assert_eq!(sheet.rows[4].time, TimeEntry::Ext);
        assert_eq!(sheet.rows[4].note, Some(note("C-2")));
        assert_eq!(sheet.rows[4].step, 5);
    }

    #[test]
    fn leading_tie_has_no_note() {
        let mut p = Pattern::default();
        p.step_mut(0).unwrap().extend = true;
        let sheet = Td3Sheet::build(&p);
        assert_eq!(sheet.rows[0].note, None);
        assert!(sheet.notes.is_empty());
        assert!(sheet.to_string().contains("(no notes)"));
    }

    #[test]
    fn track_sheet_per_chained_pattern() {
        let mut second = Pattern::default();
        second.step_mut(0).unwrap().note = Some(note("A#-1"));
        let chain = TrackChain::from_patterns([pattern(), second.clone(), pattern()]);

        let track = TrackSheet::build(&chain);
        let titles: Vec<&str> = track.sheets.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(titles, ["Track Pattern 1", "Track Pattern 2", "Track Pattern 3"]);
        assert_eq!(track.sheets[1].1, Td3Sheet::build(&second));
        assert_eq!(track.sheets[2].1, track.sheets[0].1);

        let text = track.to_string();
        assert!(text.starts_with("=== Track Pattern 1 ===\nPITCH MODE"));
        assert_eq!(text.matches("PITCH MODE").count(), 3);
    }
}
