//! Step grid - one page of the bassline and the drum lanes

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use acidstep::sequencing::{chain::is_linked, DrumInstrument, Pattern, STEPS_PER_PAGE};

use super::state::{EditorState, Lane};

const LABEL_WIDTH: usize = 7;
const CELL_WIDTH: usize = 5;

fn label(text: &str, active: bool) -> Span<'static> {
    Span::styled(
        format!("{text:<w$}", w = LABEL_WIDTH),
        Style::default().fg(if active { Color::White } else { Color::DarkGray }),
    )
}

fn cell_style(step: usize, editor: &EditorState, lane: Lane, playhead: Option<usize>) -> Style {
    let mut style = Style::default();
    if step % 4 == 0 {
        style = style.fg(Color::Gray);
    }
    if playhead == Some(step) {
        style = style.bg(Color::Yellow).fg(Color::Black);
    }
    if editor.cursor == step && editor.lane == lane {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

pub fn render_grid(frame: &mut Frame, area: Rect, pattern: &Pattern, editor: &EditorState, playhead: Option<usize>) {
    let page = editor.page().min(pattern.pages().saturating_sub(1));
    let first = page * STEPS_PER_PAGE;
    let steps = first..(first + STEPS_PER_PAGE).min(pattern.len());

    let block = Block::default()
        .title(format!(" Page {}/{} ", page + 1, pattern.pages()))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    let mut numbers = vec![Span::raw(" ".repeat(LABEL_WIDTH))];
    for i in steps.clone() {
        numbers.push(Span::styled(
            format!("{:<w$}", i + 1, w = CELL_WIDTH),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::from(numbers));

    // Notes; tied and slid-into steps show what they sound
    let mut notes = vec![label("Bass", editor.lane == Lane::Bass)];
    let mut flags = vec![label("", false)];
    for i in steps.clone() {
        let step = pattern.steps()[i];
        let text = match (step.note, step.extend) {
            (_, true) => "~~~".to_string(),
            (Some(note), false) => note.to_string(),
            (None, false) => "·".to_string(),
        };
        let mut style = cell_style(i, editor, Lane::Bass, playhead);
        if is_linked(pattern.steps(), i) {
            style = style.fg(Color::Cyan);
        }
        notes.push(Span::styled(format!("{text:<w$}", w = CELL_WIDTH), style));

        let flag_text = format!(
            "{}{}{}",
            if step.accent { "A" } else { " " },
            if step.slide { "S" } else { " " },
            if step.extend { "E" } else { " " },
        );
        flags.push(Span::styled(
            format!("{flag_text:<w$}", w = CELL_WIDTH),
            Style::default().fg(Color::Magenta),
        ));
    }
    lines.push(Line::from(notes));
    lines.push(Line::from(flags));

    for instrument in DrumInstrument::ALL {
        let lane = pattern.drums().lane(instrument);
        let active = editor.lane == Lane::Drum(instrument);
        let mut spans = vec![label(short_name(instrument), active)];
        for i in steps.clone() {
            let text = if lane.is_on(i) { "■" } else { "·" };
            spans.push(Span::styled(
                format!("{text:<w$}", w = CELL_WIDTH),
                cell_style(i, editor, Lane::Drum(instrument), playhead),
            ));
        }
        spans.push(Span::styled(
            format!(" vol {:>3.0}%", lane.volume * 100.0),
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn short_name(instrument: DrumInstrument) -> &'static str {
    match instrument {
        DrumInstrument::Kick => "Kick",
        DrumInstrument::Snare => "Snare",
        DrumInstrument::ClosedHat => "CH",
        DrumInstrument::OpenHat => "OH",
        DrumInstrument::Clap => "Clap",
    }
}
