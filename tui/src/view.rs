//! Chat Screen Rendering
//!
//! Paints a [`UiState`] into a ratatui frame:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ transcript (scrollable)      │
//! │ ⣾ Thinking...                │
//! ├──────────────────────────────┤  separator
//! │ You: input_                  │  INPUT_HEIGHT rows
//! ├──────────────────────────────┤
//! │ status                       │  1 row
//! └──────────────────────────────┘
//! ```

use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::Frame;

use crate::state::{Role, UiPhase, UiState, INPUT_HEIGHT, PLACEHOLDER};
use crate::theme::{
    ASSISTANT_VIOLET, DIM_GRAY, ERROR_RED, INPUT_DISABLED, OVERFLOW_YELLOW, SEPARATOR,
    SPINNER_TEAL, USER_GREEN,
};
use crate::widgets::transcript::Transcript;

/// Draw the whole chat screen
///
/// `label` names the model and protocol in the status line. Writes the
/// wrapped transcript length back into `state.scroll`.
pub fn draw(frame: &mut Frame, state: &mut UiState, label: &str) {
    let [transcript, input, status] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let lines = transcript_lines(state);
    frame.render_stateful_widget(Transcript::new(&lines), transcript, &mut state.scroll);

    render_input(frame.buffer_mut(), input, state);
    render_status(frame.buffer_mut(), status, state, label);
}

/// Logical (unwrapped) transcript lines with their styles
pub fn transcript_lines(state: &UiState) -> Vec<(String, Style)> {
    let mut lines = Vec::new();

    if state.conversation().is_empty() && state.phase() == UiPhase::Idle {
        lines.push((PLACEHOLDER.to_string(), Style::default().fg(DIM_GRAY)));
        return lines;
    }

    let last = state.conversation().len().saturating_sub(1);
    for (i, msg) in state.conversation().iter().enumerate() {
        let style = match msg.role {
            Role::User => Style::default().fg(USER_GREEN),
            Role::Assistant => Style::default().fg(ASSISTANT_VIOLET),
        };

        let mut text = format!("{}{}", msg.role.prefix(), msg.content);
        if i == last && state.is_streaming() {
            text.push('_');
        }
        for line in text.lines() {
            lines.push((line.to_string(), style));
        }
        lines.push((String::new(), Style::default()));
    }

    if state.phase() == UiPhase::Waiting {
        lines.push((
            format!("{} Thinking...", state.spinner()),
            Style::default().fg(SPINNER_TEAL),
        ));
    }

    lines
}

/// Separator plus the wrapped input, pinned to its last rows
fn render_input(buf: &mut Buffer, area: Rect, state: &UiState) {
    if area.height == 0 {
        return;
    }

    let separator = "-".repeat(area.width as usize);
    buf.set_string(area.x, area.y, &separator, Style::default().fg(SEPARATOR));

    let text_height = area.height.saturating_sub(1) as usize;
    let text_width = area.width.saturating_sub(1) as usize;
    if text_width < 5 || text_height < 1 {
        return;
    }

    let (full_input, style) = match state.phase() {
        UiPhase::Idle => (
            format!("You: {}_", state.input()),
            Style::default().fg(USER_GREEN),
        ),
        UiPhase::Waiting => ("You: ".to_string(), Style::default().fg(INPUT_DISABLED)),
    };

    let wrapped: Vec<String> = full_input
        .split('\n')
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, text_width)
                    .into_iter()
                    .map(|cow| cow.into_owned())
                    .collect()
            }
        })
        .collect();

    let skip = wrapped.len().saturating_sub(text_height);
    for (i, line) in wrapped.iter().skip(skip).enumerate() {
        let y = area.y + 1 + i as u16;
        buf.set_string(area.x, y, line, style);
    }

    if skip > 0 {
        buf.set_string(
            area.x + area.width.saturating_sub(3),
            area.y,
            "^",
            Style::default().fg(OVERFLOW_YELLOW),
        );
    }
}

fn render_status(buf: &mut Buffer, area: Rect, state: &UiState, label: &str) {
    if area.height == 0 {
        return;
    }

    if let Some(error) = state.last_error() {
        let status = format!(" Error: {error}");
        buf.set_stringn(
            area.x,
            area.y,
            &status,
            area.width as usize,
            Style::default().fg(ERROR_RED),
        );
        return;
    }

    let phase = if state.stream_closed() {
        "Backend worker stopped"
    } else {
        match state.phase() {
            UiPhase::Idle => "Ready",
            UiPhase::Waiting => "Thinking",
        }
    };

    let hint = match state.phase() {
        UiPhase::Idle => "Enter send | Alt+Enter newline | Esc quit",
        UiPhase::Waiting => "Ctrl+C quit",
    };

    let scroll_info = if state.scroll.offset > 0 {
        format!(" [^{} lines - PgDn to scroll]", state.scroll.offset)
    } else {
        String::new()
    };

    let status = format!(" {label} | {phase} | {hint}{scroll_info}");
    buf.set_stringn(
        area.x,
        area.y,
        &status,
        area.width as usize,
        Style::default().fg(Color::DarkGray),
    );
}
