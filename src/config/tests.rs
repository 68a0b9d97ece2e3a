//! Configuration tests
//!
//! Guards that `to_toml()` stays parseable by the file schema and that every
//! persisted field survives a round trip.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_roundtrip_default() {
    let toml_str = Config::default().to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
}

#[test]
fn test_config_roundtrip_preserves_values() {
    let mut config = Config::default();
    config.provider.kind = ProviderKind::OpenAi;
    config.provider.model = "gpt-4o".to_string();
    config.provider.api_base = Some("https://openrouter.ai/api/v1".to_string());
    config.provider.api_key_env = "OPENROUTER_API_KEY".to_string();
    config.provider.timeout_secs = 45;
    config.selection.debounce_ms = 250;
    config.selection.preview_chars = 80;
    config.logging.level = "debug".to_string();
    config.logging.file_enabled = true;
    config.logging.file_rotation = LogRotation::Hourly;

    let file: FileConfig = toml::from_str(&config.to_toml()).expect("valid toml");
    let restored = Config::resolve(file, no_env);

    assert_eq!(restored.provider.kind, ProviderKind::OpenAi);
    assert_eq!(restored.provider.model, "gpt-4o");
    assert_eq!(
        restored.provider.api_base.as_deref(),
        Some("https://openrouter.ai/api/v1")
    );
    assert_eq!(restored.provider.api_key_env, "OPENROUTER_API_KEY");
    assert_eq!(restored.provider.timeout_secs, 45);
    assert_eq!(restored.selection.debounce_ms, 250);
    assert_eq!(restored.selection.preview_chars, 80);
    assert_eq!(restored.logging.level, "debug");
    assert!(restored.logging.file_enabled);
    assert_eq!(restored.logging.file_rotation, LogRotation::Hourly);
}

#[test]
fn test_api_key_never_serialized() {
    let mut config = Config::default();
    config.provider.api_key = Some("sk-secret".to_string());
    assert!(!config.to_toml().contains("sk-secret"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_defaults_without_file_or_env() {
    let config = Config::resolve(FileConfig::default(), no_env);
    assert_eq!(config.provider.kind, ProviderKind::Gemini);
    assert_eq!(config.provider.api_key_env, "GEMINI_API_KEY");
    assert_eq!(config.provider.api_key, None);
    assert_eq!(config.selection.debounce_ms, 100);
    assert_eq!(config.selection.preview_chars, 50);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
[provider]
kind = "gemini"
model = "gemini-1.5-pro"

[selection]
debounce_ms = 300
"#,
    )
    .unwrap();

    let env = env_from(&[
        ("TRADELENS_PROVIDER", "demo"),
        ("TRADELENS_DEBOUNCE_MS", "40"),
    ]);
    let config = Config::resolve(file, env);

    assert_eq!(config.provider.kind, ProviderKind::Demo);
    // File model still applies when env does not set one
    assert_eq!(config.provider.model, "gemini-1.5-pro");
    assert_eq!(config.selection.debounce_ms, 40);
}

#[test]
fn test_key_read_from_named_env_var() {
    let file: FileConfig = toml::from_str(
        r#"
[provider]
kind = "openai"
api_key_env = "MY_KEY"
"#,
    )
    .unwrap();

    let config = Config::resolve(file, env_from(&[("MY_KEY", "abc123")]));
    assert_eq!(config.provider.api_key.as_deref(), Some("abc123"));
    assert_eq!(config.provider.model, "gpt-4o-mini");
}

#[test]
fn test_kind_switch_changes_key_env_default() {
    let config = Config::resolve(
        FileConfig::default(),
        env_from(&[("TRADELENS_PROVIDER", "openai"), ("OPENAI_API_KEY", "k")]),
    );
    assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(config.provider.api_key.as_deref(), Some("k"));
}

#[test]
fn test_blank_key_is_missing() {
    let config = Config::resolve(FileConfig::default(), env_from(&[("GEMINI_API_KEY", "  ")]));
    assert_eq!(config.provider.api_key, None);
}

#[test]
fn test_log_rotation_parsing() {
    assert_eq!(LogRotation::from_str("HOURLY"), LogRotation::Hourly);
    assert_eq!(LogRotation::from_str("never"), LogRotation::Never);
    assert_eq!(LogRotation::from_str("weekly"), LogRotation::Daily);
}
