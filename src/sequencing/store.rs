//! The editable pattern plus its undo history.
//!
//! All edits go through [`PatternStore`]. Discrete edits (note toggles, flag
//! toggles, clear, page count, load) snapshot the pattern before changing it.
//! Continuous controls (knobs, drum volumes) apply immediately and commit one
//! snapshot per gesture once they settle.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use super::history::{History, Settle};
use super::notes::Note;
use super::pattern::{clamp_volume, DrumInstrument, KnobKey, Pattern, StepFlag, Waveform};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_KNOB_SETTLE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct PatternStore {
    pattern: Pattern,
    history: History<Pattern>,
    settle: Settle<Pattern>,
}

impl Default for PatternStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_KNOB_SETTLE)
    }
}

impl PatternStore {
    pub fn new(history_capacity: usize, knob_settle: Duration) -> Self {
        Self {
            pattern: Pattern::default(),
            history: History::new(history_capacity),
            settle: Settle::new(knob_settle),
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Set or clear the note at `step`.
    ///
    /// Toggling the note already there clears it. Input that is not a note
    /// also clears the step. Out-of-range steps are ignored.
    pub fn toggle_note(&mut self, step: usize, raw: &str) -> bool {
        if step >= self.pattern.len() {
            return false;
        }
        let note = Note::normalize(raw);
        self.commit();
        if let Some(slot) = self.pattern.step_mut(step) {
            slot.note = if slot.note.is_some() && slot.note == note {
                None
            } else {
                note
            };
        }
        true
    }

    pub fn toggle_flag(&mut self, step: usize, flag: StepFlag) -> bool {
        if step >= self.pattern.len() {
            return false;
        }
        self.commit();
        if let Some(slot) = self.pattern.step_mut(step) {
            slot.toggle(flag);
        }
        true
    }

    pub fn toggle_drum(&mut self, instrument: DrumInstrument, step: usize) -> bool {
        if step >= self.pattern.len() {
            return false;
        }
        self.commit();
        let lane = self.pattern.drums_mut().lane_mut(instrument);
        if let Some(cell) = lane.steps.get_mut(step) {
            *cell = !*cell;
        }
        true
    }

    /// Empty every step and drum cell as one undo step
    pub fn clear_all(&mut self) {
        self.commit();
        self.pattern.clear();
    }

    pub fn set_pages(&mut self, pages: usize) {
        self.commit();
        self.pattern.set_pages(pages);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        if self.pattern.waveform == waveform {
            return;
        }
        self.commit();
        self.pattern.waveform = waveform;
    }

    /// Apply a knob value now; history is written when the gesture settles
    pub fn set_knob(&mut self, key: KnobKey, value: f32, now: Instant) -> f32 {
        let value = key.clamp(value);
        if self.pattern.knobs.get(key) == value {
            return value;
        }
        let pattern = &self.pattern;
        self.settle.touch(now, || pattern.clone());
        self.pattern.knobs.set(key, value)
    }

    /// Same settle behaviour as knobs
    pub fn set_drum_volume(&mut self, instrument: DrumInstrument, volume: f32, now: Instant) -> f32 {
        let volume = clamp_volume(volume);
        if self.pattern.drums().lane(instrument).volume == volume {
            return volume;
        }
        let pattern = &self.pattern;
        self.settle.touch(now, || pattern.clone());
        self.pattern.drums_mut().lane_mut(instrument).volume = volume;
        volume
    }

    /// Commit a settled knob gesture. Returns true if one was committed.
    pub fn settle(&mut self, now: Instant) -> bool {
        match self.settle.poll(now) {
            Some(before) => {
                debug!("knob gesture settled");
                self.history.commit(before);
                true
            }
            None => false,
        }
    }

    /// Replace the pattern with the normalized form of arbitrary JSON
    pub fn load_from(&mut self, raw: &Value) {
        self.replace(Pattern::from_value(raw));
    }

    pub fn load_json(&mut self, text: &str) -> crate::Result<()> {
        let pattern = Pattern::from_json_str(text)?;
        self.replace(pattern);
        Ok(())
    }

    /// Swap in a whole pattern as one undo step
    pub fn replace(&mut self, pattern: Pattern) {
        self.commit();
        self.pattern = pattern;
    }

    pub fn undo(&mut self) -> bool {
        self.flush_settle();
        let current = std::mem::take(&mut self.pattern);
        match self.history.undo(current) {
            Ok(previous) => {
                self.pattern = previous;
                debug!(depth = self.history.depth(), "undo");
                true
            }
            Err(current) => {
                self.pattern = current;
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        self.flush_settle();
        let current = std::mem::take(&mut self.pattern);
        match self.history.redo(current) {
            Ok(next) => {
                self.pattern = next;
                debug!(depth = self.history.depth(), "redo");
                true
            }
            Err(current) => {
                self.pattern = current;
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.has_undo() || self.settle.is_pending()
    }

    pub fn can_redo(&self) -> bool {
        self.history.has_redo() && !self.settle.is_pending()
    }

    pub fn to_json(&self) -> String {
        self.pattern.to_json_pretty()
    }

    fn flush_settle(&mut self) {
        if let Some(before) = self.settle.take() {
            self.history.commit(before);
        }
    }

    fn commit(&mut self) {
        self.flush_settle();
        self.history.commit(self.pattern.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note(s: &str) -> Option<Note> {
        Note::normalize(s)
    }

    #[test]
    fn toggle_note_sets_and_clears() {
        let mut store = PatternStore::default();
        assert!(store.toggle_note(0, "c2"));
        assert_eq!(store.pattern().step(0).unwrap().note, note("C-2"));
        store.toggle_note(0, "C-2");
        assert_eq!(store.pattern().step(0).unwrap().note, None);
        store.toggle_note(0, "Db-2");
        store.toggle_note(0, "E-2");
        assert_eq!(store.pattern().step(0).unwrap().note, note("E-2"));
    }

    #[test]
    fn toggle_note_with_garbage_clears() {
        let mut store = PatternStore::default();
        store.toggle_note(3, "G-2");
        store.toggle_note(3, "H-9");
        assert_eq!(store.pattern().step(3).unwrap().note, None);
    }

    #[test]
    fn out_of_range_is_noop_without_commit() {
        let mut store = PatternStore::default();
        assert!(!store.toggle_note(16, "C-2"));
        assert!(!store.toggle_flag(99, StepFlag::Slide));
        assert!(!store.toggle_drum(DrumInstrument::Kick, 16));
        assert!(!store.can_undo());
    }

    #[test]
    fn flags_are_independent() {
        let mut store = PatternStore::default();
        store.toggle_flag(2, StepFlag::Accent);
        store.toggle_flag(2, StepFlag::Slide);
        store.toggle_flag(2, StepFlag::Extend);
        let step = store.pattern().step(2).unwrap();
        assert!(step.accent && step.slide && step.extend);
        store.toggle_flag(2, StepFlag::Slide);
        assert!(!store.pattern().step(2).unwrap().slide);
    }

    #[test]
    fn clear_all_is_one_undo_step() {
        let mut store = PatternStore::default();
        for i in 0..8 {
            store.toggle_note(i, "A-1");
        }
        store.toggle_drum(DrumInstrument::Kick, 0);
        let before = store.pattern().clone();
        store.clear_all();
        assert!(store.pattern().is_blank());
        assert!(!store.pattern().drums().lane(DrumInstrument::Kick).is_on(0));
        assert!(store.undo());
        assert_eq!(store.pattern(), &before);
    }

    #[test]
    fn undo_redo_symmetry() {
        let mut store = PatternStore::default();
        store.toggle_note(0, "C-2");
        store.toggle_flag(0, StepFlag::Accent);
        store.set_pages(3);
        let after = store.pattern().clone();

        assert!(store.undo());
        assert_eq!(store.pattern().pages(), 1);
        assert!(store.pattern().step(0).unwrap().accent);
        assert!(store.redo());
        assert_eq!(store.pattern(), &after);

        assert!(store.undo());
        assert!(store.undo());
        assert!(store.undo());
        assert_eq!(store.pattern(), &Pattern::default());
        assert!(!store.undo());
        assert_eq!(store.pattern(), &Pattern::default());
    }

    #[test]
    fn redo_cleared_by_new_edit() {
        let mut store = PatternStore::default();
        store.toggle_note(0, "C-2");
        store.undo();
        assert!(store.can_redo());
        store.toggle_note(1, "D-2");
        assert!(!store.can_redo());
        assert!(!store.redo());
    }

    #[test]
    fn knob_drag_is_one_undo_step() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut store = PatternStore::default();

        store.set_knob(KnobKey::Cutoff, 900.0, start);
        store.set_knob(KnobKey::Cutoff, 1200.0, start + ms(50));
        assert_eq!(store.set_knob(KnobKey::Cutoff, 9000.0, start + ms(100)), 4000.0);
        assert!(!store.settle(start + ms(200)));
        assert!(store.settle(start + ms(400)));

        assert!(store.undo());
        assert_eq!(store.pattern().knobs.cutoff, 800.0);
        assert!(!store.undo());
    }

    #[test]
    fn knob_at_its_limit_leaves_no_undo_step() {
        let now = Instant::now();
        let mut store = PatternStore::default();
        store.set_knob(KnobKey::Cutoff, 4000.0, now);
        assert!(store.settle(now + Duration::from_secs(1)));
        assert!(store.can_undo());
        store.undo();
        assert!(!store.can_undo());

        // Already at the default: pressing again changes nothing
        let default = KnobKey::Cutoff.default_value();
        assert_eq!(store.set_knob(KnobKey::Cutoff, default, now), default);
        assert_eq!(store.set_drum_volume(DrumInstrument::Kick, 3.0, now), 1.0);
        assert!(!store.can_undo());
        assert!(!store.settle(now + Duration::from_secs(1)));
    }

    #[test]
    fn pending_knob_flushes_before_undo() {
        let mut store = PatternStore::default();
        store.toggle_note(0, "C-2");
        store.set_knob(KnobKey::Resonance, 20.0, Instant::now());
        assert!(store.can_undo());

        assert!(store.undo());
        assert_eq!(store.pattern().knobs.resonance, 5.0);
        assert_eq!(store.pattern().step(0).unwrap().note, note("C-2"));
        assert!(store.undo());
        assert_eq!(store.pattern().step(0).unwrap().note, None);
    }

    #[test]
    fn pending_knob_flushes_before_commit() {
        let mut store = PatternStore::default();
        store.set_knob(KnobKey::Drive, 60.0, Instant::now());
        store.toggle_flag(0, StepFlag::Accent);
        store.undo();
        assert_eq!(store.pattern().knobs.drive, 60.0);
        store.undo();
        assert_eq!(store.pattern().knobs.drive, 0.0);
    }

    #[test]
    fn history_capacity_bounds_undo() {
        let mut store = PatternStore::new(100, DEFAULT_KNOB_SETTLE);
        for _ in 0..150 {
            store.toggle_flag(0, StepFlag::Accent);
        }
        let mut undos = 0;
        while store.undo() {
            undos += 1;
        }
        assert_eq!(undos, 100);
        // 150 toggles, 100 undone: 50 toggles remain applied, an even count
        assert!(!store.pattern().step(0).unwrap().accent);
    }

    #[test]
    fn load_from_commits_and_normalizes() {
        let mut store = PatternStore::default();
        store.load_from(&json!({ "steps": [{ "note": "Zz-9" }, { "note": "Bb-1", "slide": 1 }] }));
        assert_eq!(store.pattern().step(0).unwrap().note, None);
        assert_eq!(store.pattern().step(1).unwrap().note, note("A#-1"));
        assert!(store.pattern().step(1).unwrap().slide);
        assert!(store.undo());
        assert_eq!(store.pattern(), &Pattern::default());
    }

    #[test]
    fn load_json_rejects_only_syntax() {
        let mut store = PatternStore::default();
        assert!(store.load_json("[").is_err());
        assert!(!store.can_undo());
        assert!(store.load_json("{}").is_ok());
        assert!(store.can_undo());
    }

    #[test]
    fn waveform_and_drum_volume() {
        let mut store = PatternStore::default();
        store.set_waveform(Waveform::Sawtooth);
        assert!(!store.can_undo());
        store.set_waveform(Waveform::Square);
        assert_eq!(store.pattern().waveform, Waveform::Square);

        let v = store.set_drum_volume(DrumInstrument::Clap, 1.7, Instant::now());
        assert_eq!(v, 1.0);
        store.set_drum_volume(DrumInstrument::Clap, 0.25, Instant::now());
        store.undo();
        assert_eq!(store.pattern().drums().lane(DrumInstrument::Clap).volume, 1.0);
    }
}
