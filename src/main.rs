// tradelens - Multi-timeframe trading chart analysis in the terminal
//
// Upload chart screenshots, let a vision model detect each chart's
// timeframe, run a per-timeframe analysis plus a final aggregated
// recommendation, then select any passage of the results and ask a
// follow-up question about it.
//
// Architecture:
// - Vision (reqwest): provider trait with Gemini, OpenAI-compatible and demo backends
// - Analysis: upload batch, classifier, sequential pipeline publishing watch snapshots
// - Selection: debounced text-selection tracker and the shared selection store
// - Chat: contextual sessions seeded from a selection
// - TUI (ratatui): results tabs, query bar, chat panel; headless `analyze` for scripts
// - Event system: mpsc channel carries background-task outcomes to the TUI

mod analysis;
mod chat;
mod cli;
mod config;
mod events;
mod headless;
mod logging;
mod selection;
mod tui;
mod vision;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, LogRotation, LoggingConfig};
use logging::{LogBuffer, TuiLogLayer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands never touch logging or the terminal
    if let Some(Commands::Config {
        show,
        reset,
        edit,
        update,
        path,
    }) = &cli.command
    {
        return cli::handle_config(*show, *reset, *edit, *update, *path);
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let config = Config::from_env();

    let log_buffer = LogBuffer::new();
    let tui_mode = cli.command.is_none();
    // The guard must stay alive for the whole run so file logs flush
    let _file_guard = init_logging(&config.logging, &log_buffer, tui_mode);

    tracing::info!(
        version = config::VERSION,
        provider = config.provider.kind.as_str(),
        model = %config.provider.model,
        "tradelens starting"
    );

    match cli.command {
        Some(Commands::Analyze { images, json }) => {
            let succeeded = headless::run_analyze(&config, &images, json).await?;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        _ => tui::run_tui(config, log_buffer, cli.images).await,
    }
}

/// Initialize tracing
///
/// TUI mode captures logs into the buffer (writing to the terminal would
/// garble the display); headless mode writes to stderr so stdout carries
/// only the report. File logging adds a rotating JSON layer on top.
///
/// Precedence: RUST_LOG env var > config file > default "info"
fn init_logging(
    logging: &LoggingConfig,
    log_buffer: &LogBuffer,
    tui_mode: bool,
) -> Option<WorkerGuard> {
    let default_filter = format!("tradelens={}", logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let tui_layer = tui_mode.then(|| TuiLogLayer::new(log_buffer.clone()));
    let stderr_layer =
        (!tui_mode).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let (file_layer, guard) = match file_writer(logging) {
        Some((non_blocking, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tui_layer)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Non-blocking rolling file writer, or None when file logging is off or
/// the directory can't be created
fn file_writer(
    logging: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !logging.file_enabled {
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&logging.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            logging.file_dir, e
        );
        return None;
    }

    let appender = match logging.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
        }
        LogRotation::Daily => tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix),
        LogRotation::Never => tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix),
    };

    Some(tracing_appender::non_blocking(appender))
}
