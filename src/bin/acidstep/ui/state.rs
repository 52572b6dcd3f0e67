//! Editor state and the engine's view of the UI

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use acidstep::{
    runtime::UiSink,
    sequencing::{DrumInstrument, KnobKey, PitchClass},
};

const NOTICE_TIME: Duration = Duration::from_secs(3);

/// What the engine tells the UI. Read back when drawing.
///
/// Steps are scheduled ahead of time, so highlights wait in `upcoming`
/// until the backend clock reaches them.
#[derive(Debug, Default)]
pub struct TuiSink {
    playhead: Option<usize>,
    upcoming: VecDeque<(usize, f64)>,
    pub visualizer: bool,
    notice: Option<(String, Instant)>,
}

impl TuiSink {
    /// Move the playhead to the last step that has started by `now`
    pub fn advance(&mut self, now: f64) {
        while let Some(&(step, at)) = self.upcoming.front() {
            if at > now {
                break;
            }
            self.playhead = Some(step);
            self.upcoming.pop_front();
        }
    }

    pub fn playhead(&self) -> Option<usize> {
        self.playhead
    }

    /// The latest notice while it is still fresh
    pub fn notice_text(&self, now: Instant) -> Option<&str> {
        match &self.notice {
            Some((text, since)) if now.duration_since(*since) < NOTICE_TIME => Some(text),
            _ => None,
        }
    }
}

impl UiSink for TuiSink {
    fn highlight(&mut self, step: Option<usize>, at: f64) {
        match step {
            Some(step) => self.upcoming.push_back((step, at)),
            None => {
                self.upcoming.clear();
                self.playhead = None;
            }
        }
    }

    fn visualizer(&mut self, running: bool) {
        self.visualizer = running;
    }

    fn notice(&mut self, text: &str) {
        self.notice = Some((text.to_string(), Instant::now()));
    }
}

/// Row the cursor edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Bass,
    Drum(DrumInstrument),
}

impl Lane {
    const ORDER: [Lane; 6] = [
        Lane::Bass,
        Lane::Drum(DrumInstrument::Kick),
        Lane::Drum(DrumInstrument::Snare),
        Lane::Drum(DrumInstrument::ClosedHat),
        Lane::Drum(DrumInstrument::OpenHat),
        Lane::Drum(DrumInstrument::Clap),
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|l| *l == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Debug, Clone)]
pub struct EditorState {
    pub cursor: usize,
    pub lane: Lane,
    /// Octave for keyboard note entry
    pub octave: i8,
    pub knob: KnobKey,
    /// Pattern changed since the last autosave
    pub dirty: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            cursor: 0,
            lane: Lane::Bass,
            octave: 2,
            knob: KnobKey::Cutoff,
            dirty: false,
        }
    }
}

impl EditorState {
    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        let len = len.max(1) as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn shift_octave(&mut self, delta: i8) {
        self.octave = (self.octave + delta).clamp(1, 4);
    }

    pub fn cycle_knob(&mut self, forward: bool) {
        let all = KnobKey::ALL;
        let pos = all.iter().position(|k| *k == self.knob).unwrap_or(0);
        let next = if forward { pos + 1 } else { pos + all.len() - 1 };
        self.knob = all[next % all.len()];
    }

    /// Page the cursor is on
    pub fn page(&self) -> usize {
        self.cursor / acidstep::sequencing::STEPS_PER_PAGE
    }
}

/// Tracker-style keyboard: the bottom letter row is one octave
pub fn piano_key(c: char) -> Option<PitchClass> {
    let semitone = match c {
        'z' => 0,
        's' => 1,
        'x' => 2,
        'd' => 3,
        'c' => 4,
        'v' => 5,
        'g' => 6,
        'b' => 7,
        'h' => 8,
        'n' => 9,
        'j' => 10,
        'm' => 11,
        _ => return None,
    };
    Some(PitchClass::from_semitone(semitone))
}

/// One knob nudge: a fiftieth of the range
pub fn knob_step(key: KnobKey) -> f32 {
    let (min, max) = key.range();
    (max - min) / 50.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playhead_waits_for_scheduled_time() {
        let mut sink = TuiSink::default();
        sink.highlight(Some(0), 1.0);
        sink.highlight(Some(1), 1.125);

        sink.advance(0.96);
        assert_eq!(sink.playhead(), None);
        sink.advance(1.0);
        assert_eq!(sink.playhead(), Some(0));
        sink.advance(1.2);
        assert_eq!(sink.playhead(), Some(1));
    }

    #[test]
    fn clearing_drops_pending_steps() {
        let mut sink = TuiSink::default();
        sink.highlight(Some(3), 0.5);
        sink.advance(0.5);
        sink.highlight(Some(4), 0.625);
        sink.highlight(None, 0.55);
        sink.advance(1.0);
        assert_eq!(sink.playhead(), None);
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let mut editor = EditorState::default();
        editor.move_cursor(-1, 32);
        assert_eq!(editor.cursor, 31);
        assert_eq!(editor.page(), 1);
        editor.move_cursor(1, 32);
        assert_eq!(editor.cursor, 0);
    }
}
