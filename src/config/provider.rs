//! Vision provider configuration

use serde::Deserialize;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Provider Kind
// ─────────────────────────────────────────────────────────────────────────────

/// Which vision backend to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    /// Google Gemini generateContent (default)
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
    /// Offline canned replies
    Demo,
}

impl ProviderKind {
    /// Parse kind string from config or env
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Some(Self::Gemini),
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Demo => "demo",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAi => "gpt-4o-mini",
            Self::Demo => "demo",
        }
    }

    pub fn default_key_env(&self) -> &'static str {
        match self {
            Self::Gemini | Self::Demo => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// Override for the service base URL
    pub api_base: Option<String>,
    /// Name of the env var holding the API key
    pub api_key_env: String,
    /// Resolved API key (never written to the config file)
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Simulated latency of the demo provider
    pub demo_latency_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let kind = ProviderKind::default();
        Self {
            kind,
            model: kind.default_model().to_string(),
            api_base: None,
            api_key_env: kind.default_key_env().to_string(),
            api_key: None,
            timeout_secs: 120,
            demo_latency_ms: 600,
        }
    }
}

/// Provider settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileProvider {
    pub kind: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub demo_latency_ms: Option<u64>,
}

impl ProviderConfig {
    /// Merge file values with env overrides
    ///
    /// Model and key env default per kind, so switching `kind` alone is enough.
    pub(crate) fn resolve(file: Option<FileProvider>, env: &impl Fn(&str) -> Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let kind_str = env("TRADELENS_PROVIDER").or(file.kind);
        let kind = match kind_str.as_deref() {
            Some(s) => ProviderKind::parse(s).unwrap_or_else(|| {
                eprintln!(
                    "Warning: unknown provider kind '{}', using {}",
                    s, defaults.kind
                );
                defaults.kind
            }),
            None => defaults.kind,
        };

        let model = env("TRADELENS_MODEL")
            .or(file.model)
            .unwrap_or_else(|| kind.default_model().to_string());

        let api_base = env("TRADELENS_API_BASE").or(file.api_base);

        let api_key_env = file
            .api_key_env
            .unwrap_or_else(|| kind.default_key_env().to_string());
        let api_key = env(&api_key_env).filter(|k| !k.trim().is_empty());

        Self {
            kind,
            model,
            api_base,
            api_key_env,
            api_key,
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            demo_latency_ms: file.demo_latency_ms.unwrap_or(defaults.demo_latency_ms),
        }
    }
}
