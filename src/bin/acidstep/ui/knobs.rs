//! Knob panel

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use acidstep::sequencing::{KnobKey, Knobs, Waveform};

fn unit(key: KnobKey) -> &'static str {
    match key {
        KnobKey::Tune => "st",
        KnobKey::Cutoff | KnobKey::Tone => "Hz",
        KnobKey::Resonance => "",
        KnobKey::Decay => "ms",
        KnobKey::EnvMod | KnobKey::Accent | KnobKey::Drive | KnobKey::DistVolume => "%",
    }
}

pub fn render_knobs(frame: &mut Frame, area: Rect, knobs: &Knobs, waveform: Waveform, selected: KnobKey) {
    let block = Block::default().title(" Synth ").borders(Borders::ALL);

    let mut spans = vec![Span::styled(
        format!(" {waveform}  "),
        Style::default().fg(Color::Cyan),
    )];
    for key in KnobKey::ALL {
        let style = if key == selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(
            format!("{} {:.1}{}  ", key.name(), knobs.get(key), unit(key)),
            style,
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
