//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Render `api_base` as a live key or a commented example
    fn api_base_line(&self) -> String {
        match &self.provider.api_base {
            Some(base) => format!("api_base = \"{}\"\n", base),
            None => "# api_base = \"https://generativelanguage.googleapis.com/v1beta\"\n".to_string(),
        }
    }

    /// Serialize the config to a commented TOML document
    ///
    /// The resolved API key is never written; only the env var name is.
    pub fn to_toml(&self) -> String {
        format!(
            r#"# tradelens configuration

# ─────────────────────────────────────────────────────────────────────────────
# VISION PROVIDER
# ─────────────────────────────────────────────────────────────────────────────
# kind: gemini, openai (any OpenAI-compatible endpoint), demo (offline)
# The API key is read from the environment variable named by api_key_env.
[provider]
kind = "{kind}"
model = "{model}"
{api_base}api_key_env = "{key_env}"
timeout_secs = {timeout}
demo_latency_ms = {demo_latency}

# Text selection and follow-up chat
[selection]
debounce_ms = {debounce}      # coalescing window for selection changes
preview_chars = {preview}     # selected-text preview length in the chat log

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# JSON file logging (in addition to TUI buffer or stderr)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            kind = self.provider.kind.as_str(),
            model = self.provider.model,
            api_base = self.api_base_line(),
            key_env = self.provider.api_key_env,
            timeout = self.provider.timeout_secs,
            demo_latency = self.provider.demo_latency_ms,
            debounce = self.selection.debounce_ms,
            preview = self.selection.preview_chars,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
        )
    }
}
