//! Selection tracking and chat display settings

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Coalescing window for selection-change bursts (milliseconds)
    pub debounce_ms: u64,
    /// Characters of the selected text shown in chat previews
    pub preview_chars: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            preview_chars: 50,
        }
    }
}

/// Selection settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileSelection {
    pub debounce_ms: Option<u64>,
    pub preview_chars: Option<usize>,
}

impl SelectionConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileSelection>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            debounce_ms: file.debounce_ms.unwrap_or(defaults.debounce_ms),
            preview_chars: file.preview_chars.unwrap_or(defaults.preview_chars),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
