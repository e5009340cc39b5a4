//! # dockctl
//!
//! Command-line controller for StreamDock devices. Connects to the local
//! control server, establishes a session path with a `read`, runs one
//! command and disconnects.

#![deny(unsafe_code)]

mod action;
mod demo;
mod single;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dockctl_client::ClientConfig;
use dockctl_settings::{DockSettings, LogFormat};

use crate::action::Action;
use crate::demo::DemoPlan;

/// StreamDock controller.
#[derive(Parser, Debug)]
#[command(name = "dockctl", about = "Control a StreamDock through its WebSocket server", version)]
struct Cli {
    /// WebSocket URL of the control server (overrides settings).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Session label used in log lines.
    #[arg(long, global = true, default_value = "dock")]
    name: String,

    /// Log filter such as `info` or `dockctl_core=debug` (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Seconds to wait for server replies.
    #[arg(long, global = true, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    action: Action,
}

impl Cli {
    /// Fold command-line overrides into loaded settings.
    fn apply(&self, settings: &mut DockSettings) {
        if let Some(url) = &self.url {
            settings.server.url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn init_logging(settings: &DockSettings) {
    match settings.logging.format {
        LogFormat::Compact => dockctl_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => dockctl_core::logging::init_json_subscriber(&settings.logging.level),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Settings come first so the log level is known before logging starts.
    let (mut settings, load_error) = match dockctl_settings::load_settings() {
        Ok(settings) => (settings, None),
        Err(error) => (DockSettings::default(), Some(error)),
    };
    cli.apply(&mut settings);
    init_logging(&settings);
    if let Some(error) = load_error {
        tracing::warn!(%error, "failed to load settings, using defaults");
    }
    dockctl_settings::validate(&settings).context("invalid settings")?;

    let config = ClientConfig::from_settings(&settings, cli.name.clone());
    let wait = Duration::from_secs(cli.timeout);
    tracing::debug!(url = %config.url, session = %config.name, "starting");

    match cli.action {
        Action::Demo {
            sessions,
            keys,
            image_dir,
        } => {
            let plan = DemoPlan {
                sessions,
                keys,
                image_dir,
            };
            demo::run(&config, &plan, wait).await
        }
        action => {
            let command = action
                .command()
                .context("action has no session command")?;
            single::run(&config, command, wait).await
        }
    }
}
