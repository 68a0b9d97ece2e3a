// Rendered results document with text-selection support
//
// The results panel renders the selectable regions of the active tab into
// display rows. Each row remembers which region it belongs to (headings
// between regions belong to none), so a selection can be traced back to the
// region it started in. Positions are (row, char) pairs; selections are
// inclusive of both ends, like a terminal visual selection.

use super::markdown::{line_text, render_markdown};
use super::theme::Theme;
use crate::analysis::report::SelectableRegion;
use crate::selection::RegionId;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocPos {
    pub line: usize,
    pub col: usize,
}

impl DocPos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Anchor/cursor pair; either may come first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    pub anchor: DocPos,
    pub cursor: DocPos,
}

impl TextSelection {
    pub fn collapsed(at: DocPos) -> Self {
        Self {
            anchor: at,
            cursor: at,
        }
    }

    /// (start, end) in document order
    pub fn ordered(&self) -> (DocPos, DocPos) {
        if self.anchor <= self.cursor {
            (self.anchor, self.cursor)
        } else {
            (self.cursor, self.anchor)
        }
    }
}

#[derive(Debug, Default)]
pub struct Document {
    lines: Vec<Line<'static>>,
    plain: Vec<Vec<char>>,
    regions: Vec<Option<RegionId>>,
}

impl Document {
    /// Lay out `regions` at `width` columns; region ids are their indices
    pub fn build(regions: &[SelectableRegion], width: usize, theme: &Theme) -> Self {
        let mut doc = Self::default();
        let show_titles = regions.len() > 1;

        for (index, region) in regions.iter().enumerate() {
            if show_titles {
                if index > 0 {
                    doc.push(Line::default(), None);
                }
                doc.push(
                    Line::from(Span::styled(
                        region.title.to_string(),
                        theme.title_style().add_modifier(Modifier::UNDERLINED),
                    )),
                    None,
                );
            }
            let id = Some(RegionId(index));
            for line in render_markdown(&region.text, width, theme) {
                doc.push(line, id);
            }
        }
        doc
    }

    /// Plain lines outside any region (loading, error and empty states)
    pub fn message(lines: Vec<Line<'static>>) -> Self {
        let mut doc = Self::default();
        for line in lines {
            doc.push(line, None);
        }
        doc
    }

    fn push(&mut self, line: Line<'static>, region: Option<RegionId>) {
        self.plain.push(line_text(&line).chars().collect());
        self.lines.push(line);
        self.regions.push(region);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn region_at(&self, line: usize) -> Option<RegionId> {
        self.regions.get(line).copied().flatten()
    }

    fn line_chars(&self, line: usize) -> usize {
        self.plain.get(line).map(Vec::len).unwrap_or(0)
    }

    /// Clamp a position onto existing text
    pub fn clamp(&self, pos: DocPos) -> DocPos {
        if self.lines.is_empty() {
            return DocPos::default();
        }
        let line = pos.line.min(self.lines.len() - 1);
        let col = pos.col.min(self.line_chars(line).saturating_sub(1));
        DocPos { line, col }
    }

    /// Char index under display column `column` of `line`
    pub fn column_to_char(&self, line: usize, column: usize) -> usize {
        let Some(chars) = self.plain.get(line) else {
            return 0;
        };
        let mut used = 0;
        for (index, ch) in chars.iter().enumerate() {
            used += ch.width().unwrap_or(0);
            if used > column {
                return index;
            }
        }
        chars.len().saturating_sub(1)
    }

    pub fn line_end(&self, line: usize) -> usize {
        self.line_chars(line).saturating_sub(1)
    }

    /// Text covered by a selection, rows joined with newlines
    pub fn text_in(&self, selection: &TextSelection) -> String {
        if self.is_empty() {
            return String::new();
        }
        let (start, end) = selection.ordered();
        let mut rows = Vec::new();
        for line in start.line..=end.line.min(self.len().saturating_sub(1)) {
            let chars = &self.plain[line];
            let from = if line == start.line { start.col } else { 0 };
            let to = if line == end.line {
                (end.col + 1).min(chars.len())
            } else {
                chars.len()
            };
            let row: String = chars
                .get(from.min(to)..to)
                .map(|c| c.iter().collect())
                .unwrap_or_default();
            rows.push(row.trim_end().to_string());
        }
        rows.join("\n")
    }

    /// Rows `[top, top + height)` with the selection painted over them
    pub fn visible(
        &self,
        top: usize,
        height: usize,
        selection: Option<&TextSelection>,
        style: Style,
    ) -> Vec<Line<'static>> {
        let range = selection.map(TextSelection::ordered);
        self.lines
            .iter()
            .enumerate()
            .skip(top)
            .take(height)
            .map(|(index, line)| match range {
                Some((start, end)) if index >= start.line && index <= end.line => {
                    let from = if index == start.line { start.col } else { 0 };
                    let to = if index == end.line {
                        end.col + 1
                    } else {
                        self.line_chars(index)
                    };
                    paint(line, from, to, style)
                }
                _ => line.clone(),
            })
            .collect()
    }
}

/// Patch `style` over chars `[from, to)` of a line, splitting spans as needed
fn paint(line: &Line<'static>, from: usize, to: usize, style: Style) -> Line<'static> {
    let mut spans = Vec::new();
    let mut index = 0;

    for span in &line.spans {
        let mut outside = String::new();
        let mut inside = String::new();
        for ch in span.content.chars() {
            let selected = index >= from && index < to;
            if selected && !outside.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut outside), span.style));
            }
            if !selected && !inside.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut inside), span.style.patch(style)));
            }
            if selected {
                inside.push(ch);
            } else {
                outside.push(ch);
            }
            index += 1;
        }
        if !outside.is_empty() {
            spans.push(Span::styled(outside, span.style));
        }
        if !inside.is_empty() {
            spans.push(Span::styled(inside, span.style.patch(style)));
        }
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(title: &'static str, text: &str) -> SelectableRegion {
        SelectableRegion {
            title,
            text: text.to_string(),
            full_context: text.to_string(),
        }
    }

    fn two_regions() -> Document {
        Document::build(
            &[
                region("Trading Summary", "Go long above 42000."),
                region("Analysis Reasoning", "Higher lows on the 4H."),
            ],
            80,
            &Theme::default(),
        )
    }

    #[test]
    fn test_rows_carry_their_region() {
        let doc = two_regions();
        // title, text, blank, title, text
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.region_at(0), None);
        assert_eq!(doc.region_at(1), Some(RegionId(0)));
        assert_eq!(doc.region_at(3), None);
        assert_eq!(doc.region_at(4), Some(RegionId(1)));
    }

    #[test]
    fn test_single_region_has_no_title_row() {
        let doc = Document::build(&[region("4 Hour Analysis", "Uptrend.")], 80, &Theme::default());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.region_at(0), Some(RegionId(0)));
    }

    #[test]
    fn test_text_in_is_inclusive_and_order_free() {
        let doc = two_regions();
        let forward = TextSelection {
            anchor: DocPos::new(1, 0),
            cursor: DocPos::new(1, 6),
        };
        assert_eq!(doc.text_in(&forward), "Go long");

        let backward = TextSelection {
            anchor: DocPos::new(1, 6),
            cursor: DocPos::new(1, 0),
        };
        assert_eq!(doc.text_in(&backward), "Go long");
    }

    #[test]
    fn test_text_in_spans_rows() {
        let doc = two_regions();
        let selection = TextSelection {
            anchor: DocPos::new(1, 14),
            cursor: DocPos::new(4, 5),
        };
        assert_eq!(doc.text_in(&selection), "42000.\n\nAnalysis Reasoning\nHigher");
    }

    #[test]
    fn test_paint_splits_spans() {
        let line = Line::from(vec![Span::raw("Go "), Span::raw("long now")]);
        let painted = paint(&line, 1, 5, Style::default().bg(ratatui::style::Color::Blue));
        let parts: Vec<&str> = painted.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["G", "o ", "lo", "ng now"]);
        assert_eq!(line_text(&painted), "Go long now");
    }

    #[test]
    fn test_column_to_char_handles_wide_glyphs() {
        let doc = Document::message(vec![Line::from("📈 up")]);
        assert_eq!(doc.column_to_char(0, 0), 0);
        assert_eq!(doc.column_to_char(0, 1), 0);
        assert_eq!(doc.column_to_char(0, 2), 1);
        assert_eq!(doc.column_to_char(0, 40), 3);
    }

    #[test]
    fn test_clamp_stays_on_text() {
        let doc = two_regions();
        assert_eq!(doc.clamp(DocPos::new(99, 99)), DocPos::new(4, 21));
    }
}
