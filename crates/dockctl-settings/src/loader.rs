//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DockSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `DOCKCTL_*` environment overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{DockSettings, LogFormat};

/// Resolve the settings file path.
///
/// `DOCKCTL_SETTINGS` wins; otherwise `~/.dockctl/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = read_env_string("DOCKCTL_SETTINGS") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".dockctl").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DockSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DockSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<DockSettings> {
    let defaults = serde_json::to_value(DockSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut DockSettings) {
    if let Some(v) = read_env_string("DOCKCTL_URL") {
        settings.server.url = v;
    }
    if let Some(v) = read_env_u64("DOCKCTL_KEEPALIVE_MS", 0, 3_600_000) {
        settings.session.keepalive_interval_ms = v;
    }
    if let Some(v) = read_env_usize("DOCKCTL_COMMAND_BUFFER", 1, 65_536) {
        settings.session.command_buffer = v;
    }
    if let Some(v) = read_env_string("DOCKCTL_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("DOCKCTL_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "DOCKCTL_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Reject settings the client cannot run with.
pub fn validate(settings: &DockSettings) -> Result<()> {
    let url = settings.server.url.as_str();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(SettingsError::InvalidValue(format!(
            "server.url must start with ws:// or wss://, got {url:?}"
        )));
    }
    if settings.session.command_buffer == 0 {
        return Err(SettingsError::InvalidValue(
            "session.commandBuffer must be at least 1".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"session": {"keepaliveIntervalMs": 20000, "commandBuffer": 64}});
        let source = serde_json::json!({"session": {"commandBuffer": 8}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["session"]["keepaliveIntervalMs"], 20000);
        assert_eq!(merged["session"]["commandBuffer"], 8);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── file loading (no env overrides involved) ────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_settings_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.url, "ws://127.0.0.1:9002");
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"url": "ws://10.0.0.5:9002"}, "session": {"keepaliveIntervalMs": 5000}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.server.url, "ws://10.0.0.5:9002");
        assert_eq!(settings.session.keepalive_interval_ms, 5000);
        assert_eq!(settings.session.command_buffer, 64);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(read_settings_file(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"session": {"commandBuffer": "lots"}}"#).unwrap();
        assert_matches!(read_settings_file(&path), Err(SettingsError::Json(_)));
    }

    // ── validate ────────────────────────────────────────────────────

    #[test]
    fn validate_accepts_defaults() {
        validate(&DockSettings::default()).unwrap();
    }

    #[test]
    fn validate_rejects_http_url() {
        let mut settings = DockSettings::default();
        settings.server.url = "http://127.0.0.1:9002".into();
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_zero_buffer() {
        let mut settings = DockSettings::default();
        settings.session.command_buffer = 0;
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_log_format_variants() {
        assert_eq!(parse_log_format("JSON"), Some(LogFormat::Json));
        assert_eq!(parse_log_format("text"), Some(LogFormat::Compact));
        assert_eq!(parse_log_format("xml"), None);
    }

    #[test]
    fn parse_u64_bounds() {
        assert_eq!(parse_u64_range("0", 0, 3_600_000), Some(0));
        assert_eq!(parse_u64_range("3600001", 0, 3_600_000), None);
        assert_eq!(parse_u64_range("abc", 0, 10), None);
    }

    #[test]
    fn parse_usize_bounds() {
        assert_eq!(parse_usize_range("16", 1, 65_536), Some(16));
        assert_eq!(parse_usize_range("0", 1, 65_536), None);
    }
}
