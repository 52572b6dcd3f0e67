//! Transport bar widget - tempo, play state, history and output level

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use acidstep::runtime::Mode;

/// Output level over the last visualized block
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub struct TransportView<'a> {
    pub bpm: f64,
    pub mode: Mode,
    /// Patterns in the running track chain
    pub track_len: usize,
    pub octave: i8,
    pub can_undo: bool,
    pub can_redo: bool,
    pub stats: AudioStats,
    pub notice: Option<&'a str>,
}

pub fn render_transport(frame: &mut Frame, area: Rect, view: &TransportView) {
    let block = Block::default().title(" acidstep ").borders(Borders::ALL);

    let (symbol, state, color) = match view.mode {
        Mode::Stopped => ("■", "Stopped".to_string(), Color::Yellow),
        Mode::Single => ("▶", "Pattern".to_string(), Color::Green),
        Mode::Track => ("▶", format!("Track ({})", view.track_len), Color::Green),
    };
    let history = match (view.can_undo, view.can_redo) {
        (true, true) => "undo/redo",
        (true, false) => "undo",
        (false, true) => "redo",
        (false, false) => "-",
    };

    let mut spans = vec![
        Span::styled(format!(" BPM: {:.0}  ", view.bpm), Style::default().fg(Color::Cyan)),
        Span::styled(format!("{symbol} {state}  "), Style::default().fg(color)),
        Span::styled(format!("Oct {}  ", view.octave), Style::default().fg(Color::White)),
        Span::styled(format!("History: {history}  "), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", view.stats.peak, view.stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ];
    if let Some(text) = view.notice {
        spans.push(Span::styled(text.to_string(), Style::default().fg(Color::LightRed)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
