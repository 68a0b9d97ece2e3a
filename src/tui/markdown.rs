// Markdown rendering for analysis results and chat replies
//
// pulldown-cmark events are folded into logical lines of styled spans, which
// are then word-wrapped to the panel width by display width (unicode-width),
// so wide glyphs and emoji never overflow a row. Supported: headings, bold,
// italic, inline code, fenced code blocks, lists, rules, hard/soft breaks.

use super::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A logical (unwrapped) line plus the indent used for its continuation rows
struct Logical {
    spans: Vec<Span<'static>>,
    hanging_indent: usize,
}

struct Builder<'t> {
    theme: &'t Theme,
    out: Vec<Logical>,
    current: Vec<Span<'static>>,
    hanging_indent: usize,
    styles: Vec<Style>,
    /// Next number per nesting level; `None` for bullet lists
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl<'t> Builder<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            out: Vec::new(),
            current: Vec::new(),
            hanging_indent: 0,
            styles: vec![Style::default()],
            lists: Vec::new(),
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, modify: impl FnOnce(Style) -> Style) {
        let next = modify(self.style());
        self.styles.push(next);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.out.push(Logical {
                spans: std::mem::take(&mut self.current),
                hanging_indent: self.hanging_indent,
            });
        }
    }

    fn blank(&mut self) {
        self.flush();
        let last_blank = self.out.last().map(|l| l.spans.is_empty()).unwrap_or(true);
        if !last_blank {
            self.out.push(Logical {
                spans: Vec::new(),
                hanging_indent: 0,
            });
        }
    }

    fn heading_style(&self, level: HeadingLevel) -> Style {
        let base = Style::default()
            .fg(self.theme.heading)
            .add_modifier(Modifier::BOLD);
        match level {
            HeadingLevel::H1 | HeadingLevel::H2 => base.add_modifier(Modifier::UNDERLINED),
            _ => base,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.blank();
                let style = self.heading_style(level);
                self.styles.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.pop_style();
                self.flush();
            }
            Event::Start(Tag::Paragraph) => self.flush(),
            Event::End(TagEnd::Paragraph) => {
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            Event::Start(Tag::Strong) => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Event::Start(Tag::Emphasis) => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Event::Start(Tag::Strikethrough) => {
                self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT))
            }
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                self.pop_style()
            }
            Event::Start(Tag::List(first)) => {
                self.flush();
                self.lists.push(first);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.hanging_indent = 0;
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let indent = "  ".repeat(depth);
                self.hanging_indent = indent.width() + marker.width();
                let style = Style::default().fg(self.theme.highlight);
                self.text(&format!("{}{}", indent, marker), style);
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank();
            }
            Event::Text(text) if self.in_code_block => {
                let style = Style::default()
                    .fg(self.theme.code)
                    .add_modifier(Modifier::DIM);
                for line in text.lines() {
                    self.text(&format!("  {}", line), style);
                    self.flush();
                }
            }
            Event::Text(text) => {
                let style = self.style();
                self.text(&text, style);
            }
            Event::Code(code) => {
                let style = Style::default().fg(self.theme.code);
                self.text(&code, style);
            }
            Event::SoftBreak => {
                let style = self.style();
                self.text(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.text("────────", self.theme.muted_style());
                self.blank();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Logical> {
        self.flush();
        while self.out.last().map(|l| l.spans.is_empty()).unwrap_or(false) {
            self.out.pop();
        }
        self.out
    }
}

/// Render markdown into display rows no wider than `width` columns
pub fn render_markdown(markdown: &str, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let mut builder = Builder::new(theme);
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        builder.event(event);
    }

    let width = width.max(8);
    builder
        .finish()
        .into_iter()
        .flat_map(|logical| wrap_spans(logical.spans, width, logical.hanging_indent))
        .collect()
}

/// Word-wrap styled spans; continuation rows start with `indent` spaces
pub fn wrap_spans(spans: Vec<Span<'static>>, width: usize, indent: usize) -> Vec<Line<'static>> {
    if spans.is_empty() {
        return vec![Line::default()];
    }
    let indent = indent.min(width / 2);

    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut row_width = 0usize;

    for span in spans {
        let style = span.style;
        for word in span.content.split_inclusive(' ') {
            let word_width = word.trim_end().width();

            if row_width > 0 && row_width + word_width > width {
                rows.push(Line::from(std::mem::take(&mut row)));
                row_width = 0;
                if indent > 0 {
                    row.push(Span::raw(" ".repeat(indent)));
                    row_width = indent;
                }
                if word.trim().is_empty() {
                    continue;
                }
            }

            if row_width + word_width > width {
                // Longer than a whole row: break by character
                let mut chunk = String::new();
                for ch in word.chars() {
                    let w = ch.width().unwrap_or(0);
                    if row_width + w > width && row_width > indent {
                        row.push(Span::styled(std::mem::take(&mut chunk), style));
                        rows.push(Line::from(std::mem::take(&mut row)));
                        if indent > 0 {
                            row.push(Span::raw(" ".repeat(indent)));
                        }
                        row_width = indent;
                    }
                    chunk.push(ch);
                    row_width += w;
                }
                row.push(Span::styled(chunk, style));
                continue;
            }

            row.push(Span::styled(word.to_string(), style));
            row_width += word.width();
        }
    }

    if !row.is_empty() {
        rows.push(Line::from(row));
    }
    rows
}

/// Plain text of a rendered row
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
