//! TUI module for acidstep
//!
//! Step editing, playback control, and a live spectrum of the output.

mod grid;
mod knobs;
mod spectrum;
pub mod state;
mod transport;

use std::path::Path;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use tracing::warn;

use acidstep::{
    io::{midi, Library},
    runtime::{EngineContext, Mode, UiSink},
    sequencing::{generate::random_pattern, Note, StepFlag},
    synth::AudioBackend,
};

pub use state::TuiSink;

use super::Storage;
use grid::render_grid;
use knobs::render_knobs;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use state::{knob_step, piano_key, EditorState, Lane};
use transport::{render_transport, AudioStats, TransportView};

const SPECTRUM_BANDS: usize = 64;
/// Samples kept for the level meter
const METER_LEN: usize = 1024;
/// Keyboard wait per frame; also bounds the scheduling poll interval
const FRAME: Duration = Duration::from_millis(10);
const MIDI_FILE: &str = "acidstep.mid";

type Context = EngineContext<Box<dyn AudioBackend>, TuiSink>;

pub struct UiApp {
    ctx: Context,
    library: Library<Storage>,
    /// Library ids for track mode
    track: Vec<String>,
    samples: Option<Consumer<f32>>,
    meter: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    editor: EditorState,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        ctx: Context,
        library: Library<Storage>,
        track: Vec<String>,
        samples: Option<Consumer<f32>>,
        sample_rate: f32,
    ) -> Self {
        Self {
            ctx,
            library,
            track,
            samples,
            meter: Vec::with_capacity(METER_LEN),
            spectrum: SpectrumAnalyzer::new(sample_rate, SPECTRUM_BANDS),
            editor: EditorState::default(),
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.ctx.poll();
            let now = self.ctx.backend().now();
            self.ctx.ui_mut().advance(now);
            if self.ctx.settle(Instant::now()) {
                self.editor.dirty = true;
            }
            self.poll_audio();
            self.autosave();

            terminal.draw(|frame| self.render(frame))?;

            if event::poll(FRAME)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }
        }
        Ok(())
    }

    /// Silence playback and write the pattern out one last time
    pub fn shutdown(&mut self) {
        self.ctx.silence();
        self.editor.dirty = true;
        self.autosave();
    }

    fn poll_audio(&mut self) {
        let Some(rx) = &mut self.samples else {
            return;
        };
        let available = rx.slots();
        if available == 0 {
            return;
        }
        let Ok(chunk) = rx.read_chunk(available) else {
            return;
        };
        let (first, second) = chunk.as_slices();
        let running = self.ctx.ui().visualizer;
        for part in [first, second] {
            if running {
                self.spectrum.push(part);
            }
            self.meter.extend_from_slice(part);
        }
        chunk.commit_all();

        if self.meter.len() > METER_LEN {
            let excess = self.meter.len() - METER_LEN;
            self.meter.drain(..excess);
        }
        if running {
            self.spectrum.update();
        }
    }

    fn autosave(&mut self) {
        if !self.editor.dirty {
            return;
        }
        self.editor.dirty = false;
        if let Err(e) = self.library.save_current(self.ctx.pattern()) {
            warn!(error = %e, "autosave failed");
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let len = self.ctx.pattern().len();
        let now = Instant::now();
        let was_dirty = self.editor.dirty;
        self.editor.dirty = true;

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.should_quit = true,

            // Transport
            KeyCode::Char(' ') => self.play_or_stop(),
            KeyCode::Char('t') => self.track_or_stop(),
            KeyCode::Char('<') => self.ctx.set_bpm(self.ctx.transport().bpm() - 1.0),
            KeyCode::Char('>') => self.ctx.set_bpm(self.ctx.transport().bpm() + 1.0),

            // Cursor
            KeyCode::Left => self.editor.move_cursor(-1, len),
            KeyCode::Right => self.editor.move_cursor(1, len),
            KeyCode::Up => self.editor.lane = self.editor.lane.prev(),
            KeyCode::Down => self.editor.lane = self.editor.lane.next(),
            KeyCode::PageUp => self.editor.move_cursor(-(acidstep::sequencing::STEPS_PER_PAGE as isize), len),
            KeyCode::PageDown => self.editor.move_cursor(acidstep::sequencing::STEPS_PER_PAGE as isize, len),
            KeyCode::Char('[') => self.editor.shift_octave(-1),
            KeyCode::Char(']') => self.editor.shift_octave(1),

            // Step editing
            KeyCode::Char(c) if self.editor.lane == Lane::Bass && piano_key(c).is_some() => {
                self.enter_note(c, len);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                self.ctx.store_mut().toggle_note(self.editor.cursor, "");
            }
            KeyCode::Char('a') => self.toggle_flag(StepFlag::Accent),
            KeyCode::Char('f') => self.toggle_flag(StepFlag::Slide),
            KeyCode::Char('e') => self.toggle_flag(StepFlag::Extend),
            KeyCode::Enter => {
                if let Lane::Drum(instrument) = self.editor.lane {
                    self.ctx.store_mut().toggle_drum(instrument, self.editor.cursor);
                }
            }
            KeyCode::Char('(') | KeyCode::Char(')') => {
                if let Lane::Drum(instrument) = self.editor.lane {
                    let delta = if code == KeyCode::Char(')') { 0.05 } else { -0.05 };
                    let volume = self.ctx.pattern().drums().lane(instrument).volume + delta;
                    self.ctx.store_mut().set_drum_volume(instrument, volume, now);
                }
            }

            // Sound
            KeyCode::Tab => self.editor.cycle_knob(true),
            KeyCode::BackTab => self.editor.cycle_knob(false),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('-') => {
                let key = self.editor.knob;
                let sign = if code == KeyCode::Char('-') { -1.0 } else { 1.0 };
                let value = self.ctx.pattern().knobs.get(key) + sign * knob_step(key);
                self.ctx.store_mut().set_knob(key, value, now);
            }
            KeyCode::Char('w') => {
                let waveform = self.ctx.pattern().waveform.toggled();
                self.ctx.store_mut().set_waveform(waveform);
            }

            // Whole pattern
            KeyCode::Char('u') => {
                self.ctx.store_mut().undo();
            }
            KeyCode::Char('r') => {
                self.ctx.store_mut().redo();
            }
            KeyCode::Char('P') => {
                let pages = self.ctx.pattern().pages() % acidstep::sequencing::MAX_PAGES + 1;
                self.ctx.store_mut().set_pages(pages);
                self.editor.move_cursor(0, self.ctx.pattern().len());
            }
            KeyCode::Char('R') => {
                let pages = self.ctx.pattern().pages();
                let pattern = random_pattern(&mut rand::thread_rng(), pages);
                self.ctx.store_mut().replace(pattern);
            }
            KeyCode::Char('C') => self.ctx.store_mut().clear_all(),
            KeyCode::Char('S') => self.save_to_library(),
            KeyCode::Char('M') => self.export_midi(),

            _ => self.editor.dirty = was_dirty,
        }
    }

    fn play_or_stop(&mut self) {
        if self.ctx.transport().mode() == Mode::Single {
            self.ctx.stop();
        } else {
            self.ctx.play();
        }
    }

    fn track_or_stop(&mut self) {
        if self.ctx.transport().mode() == Mode::Track {
            self.ctx.stop();
            return;
        }
        // Rebuilt on every start so library changes are picked up
        if self.ctx.play_selection(&self.track, self.library.entries()).is_err() {
            warn!(selected = self.track.len(), "nothing to play in track mode");
        }
    }

    fn enter_note(&mut self, key: char, len: usize) {
        let Some(pitch) = piano_key(key) else {
            return;
        };
        let Some(note) = Note::new(pitch, self.editor.octave) else {
            return;
        };
        let text = note.to_string();
        self.ctx.store_mut().toggle_note(self.editor.cursor, &text);
        if self.ctx.pattern().steps()[self.editor.cursor].note.is_some() {
            self.ctx.preview(&text);
        }
        self.editor.move_cursor(1, len);
    }

    fn toggle_flag(&mut self, flag: StepFlag) {
        if self.editor.lane == Lane::Bass {
            self.ctx.store_mut().toggle_flag(self.editor.cursor, flag);
        }
    }

    fn save_to_library(&mut self) {
        let name = format!("Pattern {}", self.library.entries().len() + 1);
        let bpm = self.ctx.transport().bpm();
        let message = match self.library.save_pattern(&name, bpm, self.ctx.pattern()) {
            Ok(entry) => format!("Saved \"{}\" ({})", entry.name, entry.id),
            Err(e) => {
                warn!(error = %e, "save failed");
                "Save failed".to_string()
            }
        };
        self.ctx.ui_mut().notice(&message);
    }

    fn export_midi(&mut self) {
        let bpm = self.ctx.transport().bpm();
        let message = match midi::write_pattern(self.ctx.pattern(), bpm, Path::new(MIDI_FILE)) {
            Ok(()) => format!("MIDI exported to {MIDI_FILE}"),
            Err(e) => {
                warn!(error = %e, "MIDI export failed");
                "MIDI export failed".to_string()
            }
        };
        self.ctx.ui_mut().notice(&message);
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Transport bar
                Constraint::Length(11), // Step grid
                Constraint::Length(3),  // Knobs
                Constraint::Min(6),     // Spectrum
                Constraint::Length(1),  // Help bar
            ])
            .split(frame.area());

        if !self.ctx.ui().visualizer {
            self.spectrum.clear();
        }

        let now = Instant::now();
        let view = TransportView {
            bpm: self.ctx.transport().bpm(),
            mode: self.ctx.transport().mode(),
            track_len: self.ctx.transport().track().map_or(0, |t| t.len()),
            octave: self.editor.octave,
            can_undo: self.ctx.store().can_undo(),
            can_redo: self.ctx.store().can_redo(),
            stats: AudioStats::from_buffer(&self.meter),
            notice: self.ctx.ui().notice_text(now),
        };
        render_transport(frame, chunks[0], &view);

        let pattern = self.ctx.pattern();
        render_grid(frame, chunks[1], pattern, &self.editor, self.ctx.ui().playhead());
        render_knobs(frame, chunks[2], &pattern.knobs, pattern.waveform, self.editor.knob);
        render_spectrum(frame, chunks[3], self.spectrum.levels(), self.ctx.ui().visualizer);

        let help = Paragraph::new(
            " [Space] Play  [t] Track  [z..m] Note  [a/f/e] Acc/Slide/Ext  [Enter] Drum  \
             [Tab][+/-] Knob  [u/r] Undo/Redo  [S] Save  [M] MIDI  [q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
