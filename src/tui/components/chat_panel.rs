//! Chat panel: the follow-up conversation about a selection
//!
//! Shows what is being discussed, the ordered turns with their times, an
//! "Analyzing..." line while a question is in flight, and the input box
//! (disabled while waiting).

use crate::chat::{ChatTurn, Role};
use crate::tui::app::{preview, App, Focus};
use crate::tui::markdown::render_markdown;
use crate::tui::theme::Theme;
use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn turn_lines(turn: &ChatTurn, width: usize, preview_chars: usize, theme: &Theme) -> Vec<Line<'static>> {
    let (who, color) = match turn.role {
        Role::User => ("You", theme.user),
        Role::Assistant => ("Analyst", theme.assistant),
    };
    let time = turn.created_at.with_timezone(&Local).format("%H:%M:%S");

    let mut lines = vec![Line::from(vec![
        Span::styled(who, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", time), theme.muted_style()),
    ])];
    if let Some(snapshot) = &turn.selected_text {
        lines.push(Line::from(Span::styled(
            preview(snapshot, preview_chars),
            theme.muted_style().add_modifier(Modifier::ITALIC),
        )));
    }
    lines.extend(render_markdown(&turn.text, width, theme));
    lines.push(Line::default());
    lines
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.focus == Focus::ChatInput;
    let state = app.selection_state();
    let waiting = app.chat.session().is_some_and(|s| s.is_waiting());

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused))
        .title(Span::styled(" Contextual Chat ", theme.title_style()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(inner);

    let discussing = Paragraph::new(vec![
        Line::from(Span::styled("DISCUSSING:", theme.muted_style())),
        Line::from(Span::styled(
            format!("\"{}\"", state.selected_text),
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::BOTTOM).border_style(theme.border_style(false)));
    f.render_widget(discussing, chunks[0]);

    let width = chunks[1].width.saturating_sub(1) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if let Some(session) = app.chat.session() {
        for turn in session.turns() {
            lines.extend(turn_lines(turn, width, app.preview_chars, theme));
        }
    }
    if waiting {
        lines.push(Line::from(Span::styled(
            "Analyzing...",
            Style::default().fg(theme.pending),
        )));
    }
    // Follow the newest turn
    let height = chunks[1].height as usize;
    let skip = lines.len().saturating_sub(height);
    let visible: Vec<Line> = lines.into_iter().skip(skip).collect();
    f.render_widget(Paragraph::new(visible), chunks[1]);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused && !waiting));
    let input_inner = input_block.inner(chunks[2]);
    let input_line = if waiting {
        Line::from(Span::styled("Waiting for the answer...", theme.muted_style()))
    } else if app.chat_input.is_blank() && !focused {
        Line::from(Span::styled("Ask a follow-up question...", theme.muted_style()))
    } else {
        app.chat_input.line("> ", Style::default().fg(theme.user))
    };
    f.render_widget(Paragraph::new(input_line).block(input_block), chunks[2]);

    if focused && !waiting {
        let x = input_inner.x + 2 + app.chat_input.cursor_column();
        f.set_cursor_position(Position::new(
            x.min(input_inner.right().saturating_sub(1)),
            input_inner.y,
        ));
    }
}
