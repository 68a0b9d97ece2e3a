//! Status bar: provider, focus-dependent key hints

use crate::tui::app::{App, Focus};
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Key hints for the focused surface
pub fn hints(app: &App) -> &'static str {
    let state = app.selection_state();
    match app.focus {
        Focus::PathPrompt => "Enter add  Esc cancel",
        Focus::QueryBar => "Enter ask  Esc dismiss",
        Focus::ChatInput => "Enter send  Tab results  Esc close chat",
        Focus::Results if app.visual_mode => "hjkl move  0/$ line  y copy  Esc done",
        Focus::Results if state.query_affordance_visible => {
            "i ask  y copy  Esc dismiss  v select  Tab tabs  q quit"
        }
        Focus::Results if state.chat_open => "i chat  v select  Esc close chat  Tab tabs  q quit",
        Focus::Results => "o open  a analyze  c clear  v select  Tab tabs  L logs  q quit",
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let status = format!(" {} │ {}", app.provider.name(), hints(app));
    let paragraph = Paragraph::new(status)
        .style(Style::default().fg(theme.status_bar))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style(false)),
        );
    f.render_widget(paragraph, area);
}
