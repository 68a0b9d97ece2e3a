// UI rendering
//
// Layout:
//
//   ┌ Charts ──┐┌ Results ─────────────────┐┌ Contextual Chat ┐
//   │ uploads  ││ 1 Overall │ 2 4H │ ...   ││ (when open)     │
//   ├ Progress ┤│ document                 ││                 │
//   └──────────┘└──────────────────────────┘└─────────────────┘
//               [query bar / path prompt]
//   status bar
//
// `draw` records the areas it used in `App::layout` for mouse hit-testing
// and rebuilds the results document when its width or content changed.

use super::app::{App, Focus};
use super::components::{
    chat_panel, logs_overlay, query_bar, results_panel, sidebar, status_bar,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 34;

pub fn draw(f: &mut Frame, app: &mut App) {
    let state = app.selection_state();
    let screen = f.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(2)])
        .split(screen);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(rows[0]);
    let (sidebar_area, right) = (columns[0], columns[1]);

    let (content, chat_area) = if state.chat_open {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(right);
        (split[0], split[1])
    } else {
        (right, Rect::default())
    };

    let show_query = state.query_affordance_visible;
    let show_prompt = app.focus == Focus::PathPrompt;
    let bottom_height = if show_query || show_prompt { 3 } else { 0 };
    let stacked = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(bottom_height)])
        .split(content);
    let (results_area, bottom) = (stacked[0], stacked[1]);

    let (_, body) = results_panel::split(results_area);
    app.layout.sidebar = sidebar_area;
    app.layout.results = body;
    app.layout.query_bar = if show_query && !show_prompt {
        bottom
    } else {
        Rect::default()
    };
    app.layout.chat = chat_area;
    app.refresh_document(body.width);

    sidebar::render(f, sidebar_area, app);
    results_panel::render(f, results_area, app);
    if show_prompt {
        render_path_prompt(f, bottom, app);
    } else if show_query {
        query_bar::render(f, bottom, app);
    }
    if state.chat_open {
        chat_panel::render(f, chat_area, app);
    }
    status_bar::render(f, rows[1], app);

    if app.show_logs {
        logs_overlay::render(f, screen, app);
    }
    if let Some(toast) = &app.toast {
        toast.render(f, screen, &app.theme);
    }
}

fn render_path_prompt(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(true))
        .title(Span::styled(
            " Add charts (space-separated, quote paths containing spaces) ",
            theme.title_style(),
        ));
    let inner = block.inner(area);
    let line = app
        .path_input
        .line("> ", Style::default().fg(theme.highlight));
    f.render_widget(Paragraph::new(line).block(block), area);

    let x = inner.x + 2 + app.path_input.cursor_column();
    f.set_cursor_position(Position::new(
        x.min(inner.right().saturating_sub(1)),
        inner.y,
    ));
}
