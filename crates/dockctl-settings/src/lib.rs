//! # dockctl-settings
//!
//! Configuration with layered sources for dockctl.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`DockSettings::default()`]
//! 2. **User file**: `~/.dockctl/settings.json` or `$DOCKCTL_SETTINGS`
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `DOCKCTL_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, validate};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<DockSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// Loaded on first call; falls back to compiled defaults if loading fails.
pub fn get_settings() -> &'static DockSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|error| {
            tracing::warn!(%error, "failed to load settings, using defaults");
            DockSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: DockSettings) -> std::result::Result<(), DockSettings> {
    SETTINGS.set(settings)
}
