// Application state for the TUI
//
// `App` owns the upload batch, the shared pipeline, the selection store and
// tracker, and the chat desk. Anything that talks to the vision service runs
// on a spawned task and reports back through an `AppEvent`; the event loop in
// `tui/mod.rs` feeds those into `handle_app_event`.

use super::clipboard;
use super::components::toast::Toast;
use super::document::{DocPos, Document, TextSelection};
use super::input::InputHandler;
use super::text_input::TextInput;
use super::theme::Theme;
use crate::analysis::classifier;
use crate::analysis::pipeline::{AnalysisPipeline, PipelineSnapshot, RunState};
use crate::analysis::report::regions_for;
use crate::analysis::upload::{load_images, UploadBatch};
use crate::analysis::{AnalysisResultSet, Stage, Timeframe};
use crate::chat::{ChatDesk, ChatRequest};
use crate::config::Config;
use crate::events::AppEvent;
use crate::logging::LogBuffer;
use crate::selection::{
    InteractionTarget, RegionId, SelectionEvent, SelectionHost, SelectionState, SelectionStore,
    SelectionTracker,
};
use crate::vision::{create_provider, VisionProvider};
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Results tabs in display order
pub const TABS: [Stage; 5] = [
    Stage::Final,
    Stage::Timeframe(Timeframe::H4),
    Stage::Timeframe(Timeframe::H1),
    Stage::Timeframe(Timeframe::M15),
    Stage::Timeframe(Timeframe::M5),
];

pub fn tab_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Final => "Overall",
        Stage::Timeframe(tf) => tf.heading(),
    }
}

/// Tabs that have content; Overall is always listed first when present
pub fn enabled_tabs(results: &AnalysisResultSet) -> Vec<Stage> {
    TABS.into_iter()
        .filter(|stage| results.get(*stage).is_some())
        .collect()
}

/// Next (or previous) enabled tab after `current`, wrapping around
pub fn cycle_tab(results: &AnalysisResultSet, current: Stage, forward: bool) -> Stage {
    let enabled = enabled_tabs(results);
    if enabled.is_empty() {
        return current;
    }
    let position = enabled.iter().position(|s| *s == current);
    let next = match (position, forward) {
        (Some(i), true) => (i + 1) % enabled.len(),
        (Some(i), false) => (i + enabled.len() - 1) % enabled.len(),
        (None, _) => 0,
    };
    enabled[next]
}

/// Preview of a selection snapshot as shown in the chat log
pub fn preview(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("Re: \"{}...\"", head)
}

/// Expand a leading `~` and turn a prompt entry into a path
pub fn expand_path(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        },
        None => PathBuf::from(raw),
    }
}

/// Split path-prompt input into paths
///
/// Whitespace separates entries. Single or double quotes and backslash
/// escapes keep spaces inside one path (`"my charts/btc 4h.png"`,
/// `my\ charts/btc.png`).
pub fn split_paths(raw: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, quote) {
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => current.push(c),
            ('"' | '\'', None) => quote = Some(c),
            // Only escaped whitespace or quotes; other backslashes are path separators
            ('\\', None)
                if chars
                    .peek()
                    .is_some_and(|n| n.is_whitespace() || *n == '"' || *n == '\'') =>
            {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (c, None) if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(expand_path(&current));
                    current.clear();
                }
            }
            (c, None) => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(expand_path(&current));
    }
    paths
}

/// What receives typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Results,
    PathPrompt,
    QueryBar,
    ChatInput,
}

/// Screen areas from the last frame, used for mouse hit-testing
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRects {
    pub sidebar: Rect,
    pub results: Rect,
    pub query_bar: Rect,
    pub chat: Rect,
}

/// Live highlight owner; the selection store asks it to drop the highlight
#[derive(Debug, Default)]
pub struct HighlightHost {
    drop_requested: AtomicBool,
}

impl HighlightHost {
    fn take_request(&self) -> bool {
        self.drop_requested.swap(false, Ordering::Relaxed)
    }
}

impl SelectionHost for HighlightHost {
    fn drop_highlight(&self) {
        self.drop_requested.store(true, Ordering::Relaxed);
    }
}

pub struct App {
    pub should_quit: bool,
    pub theme: Theme,
    pub provider: Arc<dyn VisionProvider>,
    pub uploads: UploadBatch,
    pub classifying: bool,
    pub pipeline: Arc<AnalysisPipeline>,
    /// Validation failure from the last analyze attempt
    pub notice: Option<String>,

    pub selection: SelectionStore,
    highlight: Arc<HighlightHost>,
    pub tracker: SelectionTracker,
    pub chat: ChatDesk,
    pub preview_chars: usize,

    // Results panel
    pub tab: Stage,
    pub document: Document,
    doc_key: Option<(Stage, u16, AnalysisResultSet, Option<String>, RunState)>,
    pub scroll: usize,
    pub text_selection: Option<TextSelection>,
    pub visual_mode: bool,
    drag_anchor: Option<DocPos>,

    // Input
    pub focus: Focus,
    pub path_input: TextInput,
    pub query_input: TextInput,
    pub chat_input: TextInput,
    pub input: InputHandler,

    pub show_logs: bool,
    pub log_buffer: LogBuffer,
    pub toast: Option<Toast>,
    pub layout: LayoutRects,
    events: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, log_buffer: LogBuffer, events: mpsc::Sender<AppEvent>) -> Self {
        Self::with_provider(create_provider(&config.provider), config, log_buffer, events)
    }

    pub fn with_provider(
        provider: Arc<dyn VisionProvider>,
        config: &Config,
        log_buffer: LogBuffer,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let highlight = Arc::new(HighlightHost::default());
        Self {
            should_quit: false,
            theme: Theme::default(),
            pipeline: Arc::new(AnalysisPipeline::new(provider.clone())),
            provider,
            uploads: UploadBatch::new(),
            classifying: false,
            notice: None,
            selection: SelectionStore::new(highlight.clone()),
            highlight,
            tracker: SelectionTracker::new(config.selection.debounce()),
            chat: ChatDesk::new(),
            preview_chars: config.selection.preview_chars,
            tab: Stage::Final,
            document: Document::default(),
            doc_key: None,
            scroll: 0,
            text_selection: None,
            visual_mode: false,
            drag_anchor: None,
            focus: Focus::Results,
            path_input: TextInput::default(),
            query_input: TextInput::default(),
            chat_input: TextInput::default(),
            input: InputHandler::default(),
            show_logs: false,
            log_buffer,
            toast: None,
            layout: LayoutRects::default(),
            events,
        }
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.snapshot()
    }

    pub fn pipeline_snapshot(&self) -> PipelineSnapshot {
        self.pipeline.snapshot()
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::info(message));
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast::error(message));
    }

    pub fn on_tick(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Background task results
    // ─────────────────────────────────────────────────────────────────────

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ImagesLoaded { images, errors } => {
                let count = images.len();
                for image in images {
                    tracing::info!(image = %image.name, size_mb = image.size_mb(), "Chart added");
                    self.uploads.add(image);
                }
                for error in &errors {
                    tracing::warn!("{}", error);
                }
                match errors.first() {
                    Some(first) => self.warn(first.clone()),
                    None if count > 0 => self.notify(format!("Added {} chart(s)", count)),
                    None => {}
                }
                self.start_classification();
            }
            AppEvent::ImageClassified { upload_id, outcome } => {
                self.uploads.record(upload_id, outcome);
            }
            AppEvent::ClassificationFinished => {
                self.classifying = false;
                // Images added while the last batch was running
                self.start_classification();
            }
            AppEvent::AnalysisFinished { error } => match error {
                None => {
                    self.tab = Stage::Final;
                    self.notify("Analysis complete");
                }
                Some(message) => self.warn(message),
            },
            AppEvent::ChatReply { session, reply } => {
                self.chat.deliver(session, reply);
            }
        }
    }

    /// Read image files on a background task
    pub fn load_paths(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        let events = self.events.clone();
        tokio::spawn(async move {
            let (images, errors) = load_images(&paths).await;
            let errors = errors.iter().map(ToString::to_string).collect();
            let _ = events.send(AppEvent::ImagesLoaded { images, errors }).await;
        });
    }

    /// Classify pending uploads one at a time, in arrival order
    fn start_classification(&mut self) {
        if self.classifying || !self.uploads.has_pending() {
            return;
        }
        self.classifying = true;

        let pending = self.uploads.pending();
        let provider = self.provider.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            for (upload_id, image) in pending {
                let outcome = classifier::classify(provider.as_ref(), &image).await;
                let event = AppEvent::ImageClassified { upload_id, outcome };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            let _ = events.send(AppEvent::ClassificationFinished).await;
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Analysis
    // ─────────────────────────────────────────────────────────────────────

    pub fn start_analysis(&mut self) {
        let images = self.uploads.image_set();
        if let Err(e) = AnalysisPipeline::validate(&images) {
            self.notice = Some(e.to_string());
            self.warn(e.to_string());
            return;
        }
        if self.pipeline.snapshot().state.is_running() {
            self.warn("Analysis already running");
            return;
        }

        self.notice = None;
        self.tab = Stage::Final;
        self.scroll = 0;

        let pipeline = self.pipeline.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let error = pipeline.run(&images).await.err().map(|e| e.to_string());
            let _ = events.send(AppEvent::AnalysisFinished { error }).await;
        });
    }

    /// Remove all uploads and reset results, progress and error
    pub fn clear(&mut self) {
        if !self.pipeline.reset() {
            self.warn("Analysis in progress");
            return;
        }
        self.uploads.clear();
        self.notice = None;
        self.tab = Stage::Final;
        self.scroll = 0;
        self.close_chat();
        self.selection.hide_query_affordance();
        self.selection.clear_selection();
        self.after_transition();
        self.notify("Cleared uploads and results");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Results document
    // ─────────────────────────────────────────────────────────────────────

    /// Rebuild the results document when its inputs changed
    ///
    /// Re-registers the tab's selectable regions with the tracker. A content
    /// change collapses any selection in the old content.
    pub fn refresh_document(&mut self, width: u16) {
        let snapshot = self.pipeline.snapshot();
        if self.tab != Stage::Final && snapshot.results.get(self.tab).is_none() {
            self.tab = Stage::Final;
        }

        let key = (
            self.tab,
            width,
            snapshot.results.clone(),
            self.notice.clone(),
            snapshot.state.clone(),
        );
        if self.doc_key.as_ref() == Some(&key) {
            return;
        }
        let content_changed = self
            .doc_key
            .as_ref()
            .map(|(tab, _, results, _, _)| *tab != self.tab || *results != snapshot.results)
            .unwrap_or(false);
        self.doc_key = Some(key);

        let regions = regions_for(&snapshot.results, self.tab);
        self.tracker.clear_regions();
        self.document = if regions.is_empty() {
            Document::message(self.placeholder(&snapshot))
        } else {
            for (index, region) in regions.iter().enumerate() {
                self.tracker
                    .register_region(RegionId(index), region.full_context.clone());
            }
            Document::build(&regions, width as usize, &self.theme)
        };

        self.text_selection = None;
        self.visual_mode = false;
        self.drag_anchor = None;
        self.scroll = self.scroll.min(self.document.len().saturating_sub(1));
        if content_changed {
            self.scroll = 0;
            self.selection_changed(SelectionEvent::cleared(InteractionTarget::Content));
        }
    }

    fn placeholder(&self, snapshot: &PipelineSnapshot) -> Vec<Line<'static>> {
        let muted = self.theme.muted_style();
        let error = self.theme.error_style();
        let line = |text: String, style| Line::from(Span::styled(text, style));

        if let Some(notice) = &self.notice {
            return vec![line(notice.clone(), error)];
        }
        match &snapshot.state {
            RunState::Failed(message) => vec![
                line("Analysis failed".to_string(), error),
                Line::default(),
                line(message.clone(), error),
            ],
            RunState::Running(stage) => vec![line(
                format!(
                    "Analyzing... {} ({}/{})",
                    stage, snapshot.progress.completed, snapshot.progress.total
                ),
                Style::default().fg(self.theme.pending),
            )],
            RunState::Completed => vec![line("No result for this tab.".to_string(), muted)],
            RunState::Idle if self.uploads.is_empty() => vec![
                line("No charts yet.".to_string(), muted),
                Line::default(),
                line("Press o to add chart images, then a to analyze.".to_string(), muted),
            ],
            RunState::Idle => vec![line(
                format!("Press a to analyze {} chart(s).", self.uploads.len()),
                muted,
            )],
        }
    }

    pub fn select_tab(&mut self, stage: Stage) {
        let results = self.pipeline.snapshot().results;
        if results.get(stage).is_some() {
            self.tab = stage;
        }
    }

    pub fn cycle_tab(&mut self, forward: bool) {
        let results = self.pipeline.snapshot().results;
        self.tab = cycle_tab(&results, self.tab, forward);
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let max = self.document.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    /// Document position under a screen cell of the results body
    pub fn doc_pos_at(&self, column: u16, row: u16) -> Option<DocPos> {
        let area = self.layout.results;
        if self.document.is_empty() || area.width == 0 || area.height == 0 {
            return None;
        }
        let row = row.clamp(area.y, area.bottom().saturating_sub(1));
        let column = column.clamp(area.x, area.right().saturating_sub(1));
        let line = self.scroll + (row - area.y) as usize;
        let line = line.min(self.document.len() - 1);
        let col = self.document.column_to_char(line, (column - area.x) as usize);
        Some(self.document.clamp(DocPos::new(line, col)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────────────

    /// Queue a raw selection change for the tracker
    pub fn selection_changed(&mut self, event: SelectionEvent) {
        self.tracker.on_selection_change(event, Instant::now());
    }

    /// Report the current highlight as a selection change
    fn report_highlight(&mut self) {
        let Some(selection) = self.text_selection else {
            return;
        };
        // A selection belongs to the region it started in
        let event = SelectionEvent {
            region: self.document.region_at(selection.anchor.line),
            text: self.document.text_in(&selection),
            target: InteractionTarget::Content,
        };
        self.selection_changed(event);
    }

    /// Evaluate a settled selection change
    pub fn poll_selection(&mut self, now: Instant) {
        if self.tracker.poll(now, &self.selection) {
            self.after_transition();
        }
    }

    /// Sync presentation state after selection-store transitions
    fn after_transition(&mut self) {
        if self.highlight.take_request() {
            self.text_selection = None;
            self.visual_mode = false;
        }
        let state = self.selection.snapshot();
        if self.focus == Focus::QueryBar && !state.query_affordance_visible {
            self.query_input.clear();
            self.focus = Focus::Results;
        }
        if self.focus == Focus::ChatInput && !state.chat_open {
            self.focus = Focus::Results;
        }
    }

    pub fn mouse_down(&mut self, column: u16, row: u16) {
        let hit = |rect: Rect| {
            column >= rect.x && column < rect.right() && row >= rect.y && row < rect.bottom()
        };
        let state = self.selection.snapshot();

        if state.query_affordance_visible && hit(self.layout.query_bar) {
            self.focus = Focus::QueryBar;
            self.selection_changed(SelectionEvent::cleared(InteractionTarget::QueryAffordance));
            return;
        }
        if state.chat_open && hit(self.layout.chat) {
            self.focus = Focus::ChatInput;
            self.selection_changed(SelectionEvent::cleared(InteractionTarget::ChatSurface));
            return;
        }

        self.focus = Focus::Results;
        self.visual_mode = false;
        if hit(self.layout.results) {
            if let Some(pos) = self.doc_pos_at(column, row) {
                self.drag_anchor = Some(pos);
                self.text_selection = None;
                self.selection_changed(SelectionEvent {
                    region: self.document.region_at(pos.line),
                    text: String::new(),
                    target: InteractionTarget::Content,
                });
                return;
            }
        }
        self.drag_anchor = None;
        self.selection_changed(SelectionEvent::cleared(InteractionTarget::Elsewhere));
    }

    pub fn mouse_drag(&mut self, column: u16, row: u16) {
        let Some(anchor) = self.drag_anchor else {
            return;
        };
        let area = self.layout.results;
        if row < area.y {
            self.scroll_by(-1);
        } else if row >= area.bottom() {
            self.scroll_by(1);
        }
        let Some(cursor) = self.doc_pos_at(column, row) else {
            return;
        };
        self.text_selection = Some(TextSelection { anchor, cursor });
        self.report_highlight();
    }

    pub fn mouse_up(&mut self) {
        self.drag_anchor = None;
    }

    /// Enter or leave keyboard selection mode
    pub fn toggle_visual(&mut self) {
        if self.visual_mode {
            self.leave_visual();
            return;
        }
        if self.document.is_empty() {
            return;
        }
        let at = self.document.clamp(DocPos::new(self.scroll, 0));
        self.visual_mode = true;
        self.text_selection = Some(TextSelection::collapsed(at));
        self.report_highlight();
    }

    pub fn leave_visual(&mut self) {
        self.visual_mode = false;
        self.text_selection = None;
        self.selection_changed(SelectionEvent::cleared(InteractionTarget::Content));
    }

    /// Move the visual-mode cursor by lines / chars
    pub fn move_cursor(&mut self, lines: isize, chars: isize) {
        let Some(selection) = self.text_selection.as_mut() else {
            return;
        };
        let cursor = selection.cursor;
        let moved = DocPos::new(
            cursor.line.saturating_add_signed(lines),
            cursor.col.saturating_add_signed(chars),
        );
        selection.cursor = self.document.clamp(moved);
        self.keep_cursor_visible();
        self.report_highlight();
    }

    /// Jump the visual-mode cursor to the start or end of its row
    pub fn cursor_to_edge(&mut self, end: bool) {
        let Some(selection) = self.text_selection.as_mut() else {
            return;
        };
        let line = selection.cursor.line;
        selection.cursor.col = if end { self.document.line_end(line) } else { 0 };
        self.report_highlight();
    }

    fn keep_cursor_visible(&mut self) {
        let Some(selection) = self.text_selection else {
            return;
        };
        let height = self.layout.results.height.max(1) as usize;
        let line = selection.cursor.line;
        if line < self.scroll {
            self.scroll = line;
        } else if line >= self.scroll + height {
            self.scroll = line + 1 - height;
        }
    }

    /// Text currently highlighted, falling back to the stored selection
    pub fn selected_text(&self) -> String {
        match &self.text_selection {
            Some(selection) => self.document.text_in(selection),
            None => self.selection.snapshot().selected_text,
        }
    }

    pub fn copy_selection(&mut self) {
        let text = self.selected_text();
        if text.trim().is_empty() {
            self.warn("Nothing selected");
            return;
        }
        match clipboard::copy_to_clipboard(&text) {
            Ok(()) => self.notify("✓ Copied to clipboard"),
            Err(e) => {
                tracing::warn!("Clipboard copy failed: {:#}", e);
                self.warn("✗ Failed to copy");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Query affordance and chat
    // ─────────────────────────────────────────────────────────────────────

    /// Move focus into the query bar or the chat input, whichever is shown
    pub fn focus_question(&mut self) {
        let state = self.selection.snapshot();
        if state.query_affordance_visible {
            self.focus = Focus::QueryBar;
        } else if state.chat_open {
            self.focus = Focus::ChatInput;
        }
        self.input.reset();
    }

    /// Submit the seed question from the query bar and open the chat
    pub fn submit_query(&mut self) {
        if self.query_input.is_blank() {
            return;
        }
        let question = self.query_input.take();
        let question = question.trim();

        self.tracker.cancel();
        self.selection.open_chat(question);
        let session = self.chat.open();
        let state = self.selection.snapshot();
        let request = self
            .chat
            .session_mut()
            .and_then(|s| s.begin(question, true, &state));
        tracing::info!(session = session.0, "Chat opened from selection");
        if let Some(request) = request {
            self.send_chat(request);
        }
        self.focus = Focus::ChatInput;
    }

    /// Hide the affordance and drop the selection
    pub fn dismiss_query(&mut self) {
        self.query_input.clear();
        self.tracker.cancel();
        self.selection.hide_query_affordance();
        self.selection.clear_selection();
        self.after_transition();
        self.focus = Focus::Results;
    }

    /// Ask a follow-up question in the open chat
    pub fn submit_chat(&mut self) {
        let waiting = self.chat.session().map(|s| s.is_waiting()).unwrap_or(true);
        if waiting || self.chat_input.is_blank() {
            return;
        }
        let question = self.chat_input.take();
        let state = self.selection.snapshot();
        let request = self
            .chat
            .session_mut()
            .and_then(|s| s.begin(&question, false, &state));
        if let Some(request) = request {
            self.send_chat(request);
        }
    }

    /// Close the chat surface and clear the selection
    pub fn close_chat(&mut self) {
        if !self.selection.snapshot().chat_open && self.chat.session().is_none() {
            return;
        }
        self.chat.close();
        self.chat_input.clear();
        self.tracker.cancel();
        self.selection.close_chat();
        self.selection.clear_selection();
        self.after_transition();
        self.focus = Focus::Results;
    }

    fn send_chat(&self, request: ChatRequest) {
        let provider = self.provider.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let reply = request.send(provider.as_ref()).await;
            let _ = events
                .send(AppEvent::ChatReply {
                    session: request.session,
                    reply,
                })
                .await;
        });
    }

    // ─────────────────────────────────────────────────────────────────────
    // Path prompt
    // ─────────────────────────────────────────────────────────────────────

    pub fn open_path_prompt(&mut self) {
        self.focus = Focus::PathPrompt;
        self.input.reset();
    }

    pub fn submit_paths(&mut self) {
        let raw = self.path_input.take();
        self.focus = Focus::Results;
        self.load_paths(split_paths(&raw));
    }

    pub fn cancel_path_prompt(&mut self) {
        self.path_input.clear();
        self.focus = Focus::Results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ChartImage;
    use crate::vision::DemoProvider;
    use std::time::Duration;

    fn test_app() -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let provider = Arc::new(DemoProvider::new(Duration::ZERO));
        let app = App::with_provider(provider, &Config::default(), LogBuffer::new(), tx);
        (app, rx)
    }

    /// Apply app events until `done` holds
    async fn pump(app: &mut App, rx: &mut mpsc::Receiver<AppEvent>, done: impl Fn(&App) -> bool) {
        while !done(app) {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event in time")
                .expect("channel open");
            app.handle_app_event(event);
        }
    }

    fn results_with(stages: &[Stage]) -> AnalysisResultSet {
        let mut results = AnalysisResultSet::default();
        for stage in stages {
            results.insert(*stage, format!("{} text", stage));
        }
        results
    }

    #[test]
    fn test_tab_cycling_skips_empty_tabs() {
        let h4 = Stage::Timeframe(Timeframe::H4);
        let m15 = Stage::Timeframe(Timeframe::M15);
        let results = results_with(&[Stage::Final, h4, m15]);

        assert_eq!(enabled_tabs(&results), vec![Stage::Final, h4, m15]);
        assert_eq!(cycle_tab(&results, Stage::Final, true), h4);
        assert_eq!(cycle_tab(&results, h4, true), m15);
        assert_eq!(cycle_tab(&results, m15, true), Stage::Final);
        assert_eq!(cycle_tab(&results, Stage::Final, false), m15);
        assert_eq!(
            cycle_tab(&AnalysisResultSet::default(), Stage::Final, true),
            Stage::Final
        );
    }

    #[test]
    fn test_preview_truncates_to_limit() {
        assert_eq!(preview("Go long above 42k", 7), "Re: \"Go long...\"");
        assert_eq!(preview("short", 50), "Re: \"short...\"");
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("charts/btc.png"), PathBuf::from("charts/btc.png"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/btc.png"), home.join("btc.png"));
        }
    }

    #[test]
    fn test_split_paths_keeps_quoted_spaces() {
        assert_eq!(
            split_paths(r#"btc_4h.png "my charts/eth 1h.png" 'a b.png' sol\ 5m.png"#),
            vec![
                PathBuf::from("btc_4h.png"),
                PathBuf::from("my charts/eth 1h.png"),
                PathBuf::from("a b.png"),
                PathBuf::from("sol 5m.png"),
            ]
        );
        assert_eq!(
            split_paths(r"C:\charts\btc.png"),
            vec![PathBuf::from(r"C:\charts\btc.png")]
        );
        assert!(split_paths("   ").is_empty());
        assert!(split_paths(r#""""#).is_empty());
    }

    #[tokio::test]
    async fn test_loaded_images_are_classified() {
        let (mut app, mut rx) = test_app();
        app.handle_app_event(AppEvent::ImagesLoaded {
            images: vec![
                ChartImage::new("btc_4h.png", "image/png", vec![1u8]),
                ChartImage::new("btc_15min.png", "image/png", vec![2u8]),
                ChartImage::new("notes.png", "image/png", vec![3u8]),
            ],
            errors: vec![],
        });
        assert!(app.classifying);

        pump(&mut app, &mut rx, |app| !app.classifying).await;

        let uploads = app.uploads.uploads();
        assert_eq!(uploads[0].detected_timeframe(), Some(Timeframe::H4));
        assert_eq!(uploads[1].detected_timeframe(), Some(Timeframe::M15));
        assert!(uploads[2].classification_error().is_some());
        assert_eq!(app.uploads.image_set().len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_without_detected_charts_sets_notice() {
        let (mut app, _rx) = test_app();
        app.start_analysis();
        assert_eq!(
            app.notice.as_deref(),
            Some(crate::analysis::pipeline::NO_IMAGES_MESSAGE)
        );
        assert_eq!(app.pipeline_snapshot().state, RunState::Idle);
    }

    #[tokio::test]
    async fn test_query_to_chat_round_trip() {
        let (mut app, mut rx) = test_app();
        let mut batch = UploadBatch::new();
        batch.add(ChartImage::new("eth_1h.png", "image/png", vec![1u8]));
        app.uploads = batch;
        app.uploads.classify_pending(app.provider.as_ref()).await;

        app.start_analysis();
        pump(&mut app, &mut rx, |app| {
            app.pipeline_snapshot().state == RunState::Completed
        })
        .await;

        // A settled selection inside the 1H region shows the affordance
        app.select_tab(Stage::Timeframe(Timeframe::H1));
        app.refresh_document(80);
        assert_eq!(app.tracker.region_count(), 1);
        app.selection_changed(SelectionEvent::in_region(RegionId(0), "Bullish pullback"));
        app.poll_selection(Instant::now() + Duration::from_secs(1));
        let state = app.selection_state();
        assert!(state.query_affordance_visible);
        assert!(state.full_context.starts_with("1H Analysis: "));

        // Seed question opens the chat and hides the affordance
        app.focus_question();
        assert_eq!(app.focus, Focus::QueryBar);
        for ch in "Where is support?".chars() {
            app.query_input.insert(ch);
        }
        app.submit_query();
        let state = app.selection_state();
        assert!(state.chat_open);
        assert!(!state.query_affordance_visible);
        assert_eq!(state.seed_question, "Where is support?");
        assert!(app.chat.session().is_some_and(|s| s.is_waiting()));

        pump(&mut app, &mut rx, |app| {
            app.chat.session().is_some_and(|s| !s.is_waiting())
        })
        .await;
        let turns = app.chat.session().map(|s| s.turns().len()).unwrap_or(0);
        assert_eq!(turns, 2);

        // Closing the chat clears everything
        app.close_chat();
        assert_eq!(app.selection_state(), SelectionState::default());
        assert!(app.chat.session().is_none());
        assert_eq!(app.focus, Focus::Results);
    }

    #[tokio::test]
    async fn test_clear_resets_uploads_and_results() {
        let (mut app, _rx) = test_app();
        app.uploads.add(ChartImage::new("btc_5m.png", "image/png", vec![1u8]));
        app.notice = Some("stale".to_string());
        app.clear();
        assert!(app.uploads.is_empty());
        assert!(app.notice.is_none());
        assert_eq!(app.pipeline_snapshot().state, RunState::Idle);
    }
}
