//! Sidebar: uploaded charts with their classification status, and the
//! pipeline progress gauge

use crate::analysis::pipeline::{PipelineSnapshot, RunState};
use crate::analysis::{Classification, UploadedImage};
use crate::tui::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

/// Status label shown next to an upload
pub fn status_label(upload: &UploadedImage) -> &'static str {
    match upload.status() {
        Classification::Pending => "DETECTING...",
        Classification::Detected(tf) => tf.heading(),
        Classification::Failed(_) => "ERROR",
    }
}

/// Gauge caption for the current run
pub fn progress_label(snapshot: &PipelineSnapshot) -> String {
    let progress = &snapshot.progress;
    match &snapshot.state {
        RunState::Idle => "Idle".to_string(),
        RunState::Running(stage) => format!(
            "{} ({}/{})",
            stage, progress.completed, progress.total
        ),
        RunState::Completed => format!("Done ({}/{})", progress.completed, progress.total),
        RunState::Failed(_) => format!("Failed ({}/{})", progress.completed, progress.total),
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = app
        .uploads
        .uploads()
        .iter()
        .map(|upload| {
            let status_style = match upload.status() {
                Classification::Pending => Style::default().fg(theme.pending),
                Classification::Detected(_) => Style::default()
                    .fg(theme.success)
                    .add_modifier(Modifier::BOLD),
                Classification::Failed(_) => theme.error_style(),
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("{:<12} ", status_label(upload)), status_style),
                Span::raw(upload.image.name.clone()),
            ])];
            if let Some(error) = upload.classification_error() {
                lines.push(Line::from(Span::styled(
                    format!("  {}", error),
                    theme.muted_style(),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let title = format!(" Charts ({}) ", app.uploads.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(theme.border_style(false))
        .title(Span::styled(title, theme.title_style()));

    if items.is_empty() {
        let hint = Paragraph::new(vec![
            Line::from(Span::styled("No charts loaded", theme.muted_style())),
            Line::from(Span::styled("Press o to add images", theme.muted_style())),
        ])
        .block(block);
        f.render_widget(hint, chunks[0]);
    } else {
        f.render_widget(List::new(items).block(block), chunks[0]);
    }

    let snapshot = app.pipeline_snapshot();
    let gauge_color = match snapshot.state {
        RunState::Failed(_) => theme.error,
        RunState::Completed => theme.success,
        _ => theme.gauge,
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(theme.border_type)
                .border_style(theme.border_style(false))
                .title(Span::styled(" Progress ", theme.title_style())),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .ratio(snapshot.progress.percent().clamp(0.0, 100.0) / 100.0)
        .label(progress_label(&snapshot));
    f.render_widget(gauge, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ChartImage, PipelineProgress, Stage, Timeframe};

    #[test]
    fn test_status_labels() {
        let mut upload = UploadedImage::new(1, ChartImage::new("a.png", "image/png", vec![0u8]));
        assert_eq!(status_label(&upload), "DETECTING...");
        upload.record(Classification::Detected(Timeframe::H4));
        assert_eq!(status_label(&upload), "4H");

        let mut failed = UploadedImage::new(2, ChartImage::new("b.png", "image/png", vec![0u8]));
        failed.record(Classification::Failed("Could not detect timeframe: daily".into()));
        assert_eq!(status_label(&failed), "ERROR");
    }

    #[test]
    fn test_progress_label_while_running() {
        let snapshot = PipelineSnapshot {
            state: RunState::Running(Stage::Timeframe(Timeframe::H1)),
            progress: PipelineProgress {
                current_stage: Some(Stage::Timeframe(Timeframe::H1)),
                completed: 1,
                total: 3,
            },
            ..Default::default()
        };
        assert_eq!(progress_label(&snapshot), "1h analysis (1/3)");
    }
}
