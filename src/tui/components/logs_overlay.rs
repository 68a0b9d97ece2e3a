//! Log overlay (toggled with `L`): the tail of the in-memory log buffer

use crate::logging::LogLevel;
use crate::tui::app::App;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Error => Color::Red,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Info => Color::Green,
        LogLevel::Debug => Color::Blue,
        LogLevel::Trace => Color::DarkGray,
    }
}

/// Module path without the crate prefix ("analysis::pipeline")
fn short_target(target: &str) -> &str {
    target.strip_prefix("tradelens::").unwrap_or(target)
}

/// Centered rect covering `percent` of `area` in both directions
fn centered(area: Rect, percent: u16) -> Rect {
    let width = area.width * percent / 100;
    let height = area.height * percent / 100;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let rect = centered(area, 85);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.highlight))
        .title(Span::styled(" Logs (L to close) ", theme.title_style()));
    let rows = block.inner(rect).height as usize;

    let lines: Vec<Line> = app
        .log_buffer
        .tail(rows)
        .into_iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    entry.timestamp.format("%H:%M:%S%.3f ").to_string(),
                    theme.muted_style(),
                ),
                Span::styled(
                    format!("{:<5} ", entry.level.as_str()),
                    Style::default().fg(level_color(entry.level)),
                ),
                Span::styled(
                    format!("{} ", short_target(&entry.target)),
                    theme.muted_style(),
                ),
                Span::raw(entry.message),
            ])
        })
        .collect();

    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered(area, 85);
        assert_eq!(rect, Rect::new(7, 3, 85, 34));
    }

    #[test]
    fn test_short_target_drops_crate_prefix() {
        assert_eq!(short_target("tradelens::analysis::pipeline"), "analysis::pipeline");
        assert_eq!(short_target("reqwest::connect"), "reqwest::connect");
    }
}
