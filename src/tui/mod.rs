// TUI module - Terminal User Interface
//
// This module manages the terminal UI using ratatui. It handles:
// - Terminal initialization and cleanup
// - The event loop (input, ticks, background-task events, pipeline
//   snapshot changes, selection debounce deadlines)
// - Layered key dispatch: text inputs capture keys first, then global keys

pub mod app;
pub mod clipboard;
pub mod components;
pub mod document;
pub mod input;
pub mod markdown;
pub mod text_input;
pub mod theme;
pub mod ui;

use crate::config::Config;
use crate::events::AppEvent;
use crate::logging::LogBuffer;
use anyhow::{Context, Result};
use app::{App, Focus, TABS};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use text_input::TextInput;
use tokio::sync::mpsc;

/// Run the TUI until the user quits
///
/// `images` are loaded (and classified) right after startup.
pub async fn run_tui(config: Config, log_buffer: LogBuffer, images: Vec<PathBuf>) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let mut app = App::new(&config, log_buffer, event_tx);
    tracing::info!(provider = app.provider.name(), "TUI started");
    app.load_paths(images);

    let result = run_event_loop(&mut terminal, &mut app, &mut event_rx).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

/// Sleep until the selection debounce deadline, or forever without one
async fn selection_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    event_rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let mut tick_interval = tokio::time::interval(Duration::from_millis(200));
    let mut pipeline_rx = app.pipeline.subscribe();

    loop {
        terminal
            .draw(|f| ui::draw(f, app))
            .context("Failed to draw terminal")?;

        let deadline = app.tracker.deadline();

        tokio::select! {
            // Keyboard or mouse input
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    match event::read() {
                        Ok(Event::Key(key_event)) => handle_key_event(app, key_event),
                        Ok(Event::Mouse(mouse_event)) => handle_mouse_event(app, mouse_event),
                        _ => {}
                    }
                }
            } => {}

            _ = tick_interval.tick() => app.on_tick(),

            Some(event) = event_rx.recv() => app.handle_app_event(event),

            // Redraw picks up the new snapshot
            Ok(()) = pipeline_rx.changed() => {}

            _ = selection_deadline(deadline) => app.poll_selection(Instant::now()),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Editing keys shared by every text input; returns false for keys it ignores
fn edit_text(input: &mut TextInput, key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => return false,
    }
    true
}

/// Handle keyboard input
/// Layered dispatch: Ctrl-C → focused text input → global/results keys
fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        app.input.release(key.code);
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    // Layer 1: text inputs capture everything
    match app.focus {
        Focus::PathPrompt => {
            match key.code {
                KeyCode::Enter => app.submit_paths(),
                KeyCode::Esc => app.cancel_path_prompt(),
                _ => {
                    edit_text(&mut app.path_input, &key);
                }
            }
            return;
        }
        Focus::QueryBar => {
            match key.code {
                KeyCode::Enter => app.submit_query(),
                KeyCode::Esc => app.dismiss_query(),
                KeyCode::Tab => app.focus = Focus::Results,
                _ => {
                    edit_text(&mut app.query_input, &key);
                }
            }
            return;
        }
        Focus::ChatInput => {
            match key.code {
                KeyCode::Enter => app.submit_chat(),
                KeyCode::Esc => app.close_chat(),
                KeyCode::Tab => app.focus = Focus::Results,
                _ => {
                    // Input is disabled while an answer is pending
                    let waiting = app.chat.session().is_some_and(|s| s.is_waiting());
                    if !waiting {
                        edit_text(&mut app.chat_input, &key);
                    }
                }
            }
            return;
        }
        Focus::Results => {}
    }

    // Layer 2: results keys, filtered for held-key repeats
    if !app.input.press(key.code) {
        return;
    }

    if app.visual_mode && handle_visual_key(app, key.code) {
        return;
    }

    let page = app.layout.results.height.max(1) as isize;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('L') => app.show_logs = !app.show_logs,
        KeyCode::Char('o') => app.open_path_prompt(),
        KeyCode::Char('a') => app.start_analysis(),
        KeyCode::Char('c') => app.clear(),
        KeyCode::Char('y') => app.copy_selection(),
        KeyCode::Char('v') => app.toggle_visual(),
        KeyCode::Char('i') | KeyCode::Enter => app.focus_question(),
        KeyCode::Esc => {
            let state = app.selection_state();
            if app.show_logs {
                app.show_logs = false;
            } else if state.chat_open {
                app.close_chat();
            } else if state.query_affordance_visible {
                app.dismiss_query();
            }
        }
        KeyCode::Tab => app.cycle_tab(true),
        KeyCode::BackTab => app.cycle_tab(false),
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.select_tab(TABS[index]);
        }
        KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1),
        KeyCode::PageDown => app.scroll_by(page),
        KeyCode::PageUp => app.scroll_by(-page),
        KeyCode::Char('g') => app.scroll = 0,
        KeyCode::Char('G') => app.scroll_by(isize::MAX),
        _ => {}
    }
}

/// Cursor movement while a keyboard selection is active
fn handle_visual_key(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1, 0),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1, 0),
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(0, -1),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(0, 1),
        KeyCode::Char('0') | KeyCode::Home => app.cursor_to_edge(false),
        KeyCode::Char('$') | KeyCode::End => app.cursor_to_edge(true),
        KeyCode::Esc | KeyCode::Char('v') => app.leave_visual(),
        _ => return false,
    }
    true
}

/// Handle mouse input: drag selection in the results, scroll, focus by click
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let over_results = {
        let area = app.layout.results;
        mouse.column >= area.x
            && mouse.column < area.right()
            && mouse.row >= area.y
            && mouse.row < area.bottom()
    };

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(),
        MouseEventKind::ScrollDown if over_results => app.scroll_by(3),
        MouseEventKind::ScrollUp if over_results => app.scroll_by(-3),
        _ => {}
    }
}
