//! Per-connection client configuration.

use std::time::Duration;

use dockctl_settings::DockSettings;

/// How long to wait for the server's close frame after sending ours.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for one session connection.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket URL of the control server.
    pub url: String,
    /// Label used in log lines.
    pub name: String,
    /// Idle time before a WebSocket ping; `None` disables keepalive.
    pub keepalive: Option<Duration>,
    /// Capacity of the handle → driver command queue.
    pub command_buffer: usize,
    /// Wait for the server's close reply before giving up.
    pub close_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_settings(&DockSettings::default(), "dock")
    }
}

impl ClientConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &DockSettings, name: impl Into<String>) -> Self {
        Self {
            url: settings.server.url.clone(),
            name: name.into(),
            keepalive: settings.session.keepalive_interval(),
            command_buffer: settings.session.command_buffer.max(1),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Same configuration pointed at another endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Same configuration under another log label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the keepalive interval.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: Option<Duration>) -> Self {
        self.keepalive = keepalive;
        self
    }
}
