//! Clipboard support for copying selected analysis text

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Copy text to the system clipboard
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(text.to_owned())
        .context("Failed to copy selection to clipboard")?;
    Ok(())
}
