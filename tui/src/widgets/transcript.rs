//! Transcript Widget
//!
//! A borderless, bottom-anchored, scrollable conversation view. Lines are
//! pre-styled by the caller; the widget wraps them to the area width, keeps
//! the scroll position in range and fades the edge rows when more content is
//! hidden above or below.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::StatefulWidget;
use textwrap::wrap;

use crate::state::ScrollState;

/// Outermost faded row
const FADE_FAR: Color = Color::Rgb(80, 80, 80);
/// Second faded row
const FADE_NEAR: Color = Color::Rgb(120, 120, 120);

/// Conversation view over a list of styled logical lines
pub struct Transcript<'a> {
    lines: &'a [(String, Style)],
}

impl<'a> Transcript<'a> {
    pub fn new(lines: &'a [(String, Style)]) -> Self {
        Self { lines }
    }
}

/// Wrap styled logical lines to `width` columns
pub fn wrap_lines(lines: &[(String, Style)], width: usize) -> Vec<(String, Style)> {
    let width = width.max(1);
    lines
        .iter()
        .flat_map(|(line, style)| {
            if line.is_empty() {
                vec![(String::new(), *style)]
            } else {
                wrap(line, width)
                    .into_iter()
                    .map(|cow| (cow.into_owned(), *style))
                    .collect()
            }
        })
        .collect()
}

impl<'a> StatefulWidget for Transcript<'a> {
    type State = ScrollState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let wrapped = wrap_lines(self.lines, area.width as usize);
        let height = area.height as usize;

        state.total_lines = wrapped.len();

        // Clamp scroll
        let max_scroll = state.total_lines.saturating_sub(height);
        state.offset = state.offset.min(max_scroll);

        let visible_end = state.total_lines.saturating_sub(state.offset);
        let visible_start = visible_end.saturating_sub(height);

        let has_content_above = visible_start > 0;
        let has_content_below = state.offset > 0;

        for (i, (line, style)) in wrapped[visible_start..visible_end].iter().enumerate() {
            let from_bottom = height.saturating_sub(1).saturating_sub(i);
            let style = if has_content_above && i < 2 {
                Style::default().fg(if i == 0 { FADE_FAR } else { FADE_NEAR })
            } else if has_content_below && from_bottom < 2 {
                Style::default().fg(if from_bottom == 0 { FADE_FAR } else { FADE_NEAR })
            } else {
                *style
            };

            let y = area.y + i as u16;
            buf.set_stringn(area.x, y, line, area.width as usize, style);
        }
    }
}
