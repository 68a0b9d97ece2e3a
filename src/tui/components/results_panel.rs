//! Results panel: stage tabs over the rendered analysis document
//!
//! Tabs without content are drawn dimmed and cannot be selected. The body is
//! the document built by `App::refresh_document`, with the live text
//! selection painted over it.

use crate::tui::app::{enabled_tabs, tab_label, App, Focus, TABS};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Tab strip and body areas inside the panel border
pub fn split(area: Rect) -> (Rect, Rect) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);
    (chunks[0], chunks[1])
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let focused = app.focus == Focus::Results;

    let mut title = vec![Span::styled(" Results ", theme.title_style())];
    if app.visual_mode {
        title.push(Span::styled(
            "[VISUAL] ",
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(focused))
        .title(Line::from(title));
    f.render_widget(block, area);

    let (tabs_area, body) = split(area);

    let results = app.pipeline_snapshot().results;
    let enabled = enabled_tabs(&results);
    let mut spans = Vec::new();
    for (index, stage) in TABS.iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(" │ ", theme.muted_style()));
        }
        let label = format!("{} {}", index + 1, tab_label(*stage));
        let style = if *stage == app.tab && enabled.contains(stage) {
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else if enabled.contains(stage) {
            Style::default().fg(theme.foreground)
        } else {
            theme.muted_style().add_modifier(Modifier::DIM)
        };
        spans.push(Span::styled(label, style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), tabs_area);

    let lines = app.document.visible(
        app.scroll,
        body.height as usize,
        app.text_selection.as_ref(),
        theme.selection_style(),
    );
    f.render_widget(Paragraph::new(lines), body);
}
