//! Settings schema.
//!
//! Every section uses `camelCase` keys on disk and `#[serde(default)]`, so a
//! settings file only needs the values it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DockSettings {
    /// Control server endpoint.
    pub server: ServerSettings,
    /// Session driver behaviour.
    pub session: SessionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Control server endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// WebSocket URL of the local control server.
    pub url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9002".to_string(),
        }
    }
}

/// Session driver behaviour.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Idle time without inbound traffic before a WebSocket ping is sent.
    /// `0` disables keepalive.
    pub keepalive_interval_ms: u64,
    /// Capacity of the command queue between handles and the driver.
    pub command_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keepalive_interval_ms: 20_000,
            command_buffer: 64,
        }
    }
}

impl SessionSettings {
    /// Keepalive interval, or `None` when disabled.
    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_ms > 0).then(|| Duration::from_millis(self.keepalive_interval_ms))
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = DockSettings::default();
        assert_eq!(settings.server.url, "ws://127.0.0.1:9002");
        assert_eq!(settings.session.keepalive_interval_ms, 20_000);
        assert_eq!(settings.session.command_buffer, 64);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn camel_case_keys() {
        let value = serde_json::to_value(DockSettings::default()).unwrap();
        assert_eq!(value["session"]["keepaliveIntervalMs"], 20_000);
        assert_eq!(value["session"]["commandBuffer"], 64);
        assert_eq!(value["logging"]["format"], "compact");
    }

    #[test]
    fn keepalive_zero_disables() {
        let session = SessionSettings {
            keepalive_interval_ms: 0,
            ..SessionSettings::default()
        };
        assert!(session.keepalive_interval().is_none());
        assert_eq!(
            SessionSettings::default().keepalive_interval(),
            Some(Duration::from_secs(20))
        );
    }
}
