//! Single-line text input used by the path prompt, query bar and chat box

use ratatui::text::{Line, Span};
use ratatui::style::Style;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Default, Clone)]
pub struct TextInput {
    chars: Vec<char>,
    /// Cursor position in chars
    cursor: usize,
}

impl TextInput {
    pub fn value(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    pub fn insert(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// Take the value and reset the input
    pub fn take(&mut self) -> String {
        let value = self.value();
        self.clear();
        value
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    /// Display column of the cursor (for placing the terminal cursor)
    pub fn cursor_column(&self) -> u16 {
        let before: String = self.chars[..self.cursor].iter().collect();
        before.width() as u16
    }

    /// Render with a prompt prefix
    pub fn line(&self, prompt: &str, prompt_style: Style) -> Line<'static> {
        Line::from(vec![
            Span::styled(prompt.to_string(), prompt_style),
            Span::raw(self.value()),
        ])
    }
}
