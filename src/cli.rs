// CLI module - command-line argument parsing and handlers
//
// - tradelens [IMAGES...]               Start the TUI, pre-loading images
// - tradelens analyze IMAGES... [--json] Headless classification + analysis
// - tradelens config --show|--reset|--edit|--update|--path

use crate::config::{Config, VERSION};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

/// Multi-timeframe chart analysis in the terminal
#[derive(Parser, Debug)]
#[command(name = "tradelens")]
#[command(version = VERSION)]
#[command(about = "Multi-timeframe trading chart analysis with a vision model", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Chart images to load on startup
    pub images: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify and analyze charts without the TUI
    Analyze {
        /// Chart images (png, jpg, webp, gif)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Print one JSON document instead of markdown
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Update config with new defaults (preserves user values)
        #[arg(long)]
        update: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Run `tradelens config ...`
pub fn handle_config(show: bool, reset: bool, edit: bool, update: bool, path: bool) -> Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show();
        Ok(())
    } else if reset {
        handle_config_reset()
    } else if edit {
        handle_config_edit()
    } else if update {
        handle_config_update()
    } else {
        println!("Usage: tradelens config [--show|--reset|--edit|--update|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --reset   Reset config file to defaults");
        println!("  --edit    Open config file in $EDITOR");
        println!("  --update  Update config with new defaults (preserves user values)");
        println!("  --path    Show config file path");
        Ok(())
    }
}

fn require_config_path() -> Result<PathBuf> {
    Config::config_path().context("Could not determine config path")
}

fn handle_config_path() -> Result<()> {
    println!("{}", require_config_path()?.display());
    Ok(())
}

fn handle_config_show() {
    let config = Config::from_env();
    let provider = &config.provider;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    println!("[provider]");
    println!("kind = {:?}", provider.kind.as_str());
    println!("model = {:?}", provider.model);
    match &provider.api_base {
        Some(base) => println!("api_base = {:?}", base),
        None => println!("# api_base = (provider default)"),
    }
    println!("api_key_env = {:?}", provider.api_key_env);
    println!(
        "# api key: {}",
        if provider.api_key.is_some() { "set" } else { "missing" }
    );
    println!("timeout_secs = {}", provider.timeout_secs);
    println!("demo_latency_ms = {}", provider.demo_latency_ms);
    println!();
    println!("[selection]");
    println!("debounce_ms = {}", config.selection.debounce_ms);
    println!("preview_chars = {}", config.selection.preview_chars);
    println!();
    println!("[logging]");
    println!("level = {:?}", config.logging.level);
    println!("file_enabled = {}", config.logging.file_enabled);
    println!("file_dir = {:?}", config.logging.file_dir.display().to_string());
    println!("file_rotation = {:?}", config.logging.file_rotation.as_str());
    println!("file_prefix = {:?}", config.logging.file_prefix);

    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
}

fn handle_config_reset() -> Result<()> {
    let path = require_config_path()?;

    if path.exists() {
        eprint!("Config file exists at {}. Overwrite? [y/N] ", path.display());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .context("Failed to read confirmation")?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn handle_config_edit() -> Result<()> {
    let path = require_config_path()?;

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    let status = Command::new(&editor).arg(&path).status().with_context(|| {
        format!(
            "Failed to launch editor '{}' (set $EDITOR to your preferred editor)",
            editor
        )
    })?;
    if !status.success() {
        bail!("Editor exited with status: {}", status);
    }
    Ok(())
}

fn handle_config_update() -> Result<()> {
    let path = require_config_path()?;

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
        return Ok(());
    }

    let updated = Config::from_env().to_toml();

    let backup_path = path.with_extension("toml.bak");
    match std::fs::copy(&path, &backup_path) {
        Ok(_) => println!("Backup created: {}", backup_path.display()),
        Err(e) => eprintln!("Warning: Could not create backup: {}", e),
    }

    std::fs::write(&path, updated)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Config updated with latest structure: {}", path.display());
    println!("Your values have been preserved.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_images_start_tui() {
        let cli = Cli::try_parse_from(["tradelens", "btc_4h.png", "btc_1h.png"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.images.len(), 2);
    }

    #[test]
    fn test_analyze_subcommand() {
        let cli = Cli::try_parse_from(["tradelens", "analyze", "a.png", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Analyze { images, json }) => {
                assert_eq!(images, vec![PathBuf::from("a.png")]);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_requires_images() {
        assert!(Cli::try_parse_from(["tradelens", "analyze"]).is_err());
    }
}
