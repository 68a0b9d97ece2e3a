// Color palette for the TUI
//
// A single palette built on the terminal's ANSI colors, so it follows
// whatever scheme the terminal already uses.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::BorderType;

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub foreground: Color,
    pub muted: Color,
    pub border: Color,
    pub border_focused: Color,
    pub border_type: BorderType,
    pub title: Color,
    pub highlight: Color,

    // Content
    pub heading: Color,
    pub code: Color,
    /// Background of the live text selection
    pub selection: Color,

    // Status
    pub success: Color,
    pub pending: Color,
    pub error: Color,
    pub status_bar: Color,
    pub gauge: Color,

    // Chat roles
    pub user: Color,
    pub assistant: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            foreground: Color::Reset,
            muted: Color::DarkGray,
            border: Color::Gray,
            border_focused: Color::Cyan,
            border_type: BorderType::Rounded,
            title: Color::Cyan,
            highlight: Color::Yellow,
            heading: Color::Magenta,
            code: Color::LightBlue,
            selection: Color::Blue,
            success: Color::Green,
            pending: Color::Yellow,
            error: Color::Red,
            status_bar: Color::Green,
            gauge: Color::Cyan,
            user: Color::Cyan,
            assistant: Color::Green,
        }
    }
}

impl Theme {
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error)
    }

    /// Style laid over selected text
    pub fn selection_style(&self) -> Style {
        Style::default().bg(self.selection).fg(Color::White)
    }
}
