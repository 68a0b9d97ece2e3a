//! Inline query affordance: appears when a selection settles inside the
//! analysis output, offering a question about the selected text

use crate::tui::app::{App, Focus};
use ratatui::{
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Single-line preview of the selection for the bar title
fn selection_preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let head: String = flat.chars().take(max_chars).collect();
        format!("\"{}…\"", head)
    } else {
        format!("\"{}\"", flat)
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.focus == Focus::QueryBar;
    let state = app.selection_state();

    let title = Line::from(vec![
        Span::styled(" Ask about ", theme.title_style()),
        Span::styled(
            selection_preview(&state.selected_text, app.preview_chars),
            Style::default().fg(theme.highlight),
        ),
        Span::raw(" "),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused))
        .title(title);

    let line = if focused || !app.query_input.is_blank() {
        app.query_input.line("> ", Style::default().fg(theme.highlight))
    } else {
        Line::from(Span::styled(
            "Press i to ask a question about the selection, Esc to dismiss",
            theme.muted_style(),
        ))
    };
    let inner = block.inner(area);
    f.render_widget(Paragraph::new(line).block(block), area);

    if focused {
        let x = inner.x + 2 + app.query_input.cursor_column();
        f.set_cursor_position(Position::new(x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(selection_preview("Go long\nabove 42k", 50), "\"Go long above 42k\"");
        assert_eq!(selection_preview("abcdef", 3), "\"abc…\"");
    }
}
