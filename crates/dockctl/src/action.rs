//! Subcommands and their mapping onto session commands.

use clap::Subcommand;
use dockctl_core::{Command, Rgb};

/// What to do once connected.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Assign an image to a key.
    SetKey {
        /// Image path as seen by the server host.
        url: String,
        /// Key slot.
        #[arg(long, short)]
        key: u32,
        /// Queue the image without redrawing.
        #[arg(long)]
        no_refresh: bool,
    },
    /// Set the background (boot logo) image.
    SetBackground {
        /// Image path as seen by the server host.
        url: String,
        /// Slot number. The server ignores it.
        #[arg(long, default_value_t = 1)]
        key: u32,
    },
    /// Redraw the device.
    Refresh,
    /// Print the device state.
    Read,
    /// Print the device identifier.
    Identify,
    /// Print the firmware version.
    Firmware,
    /// Set screen brightness (0-100).
    Brightness {
        /// Brightness level.
        value: u8,
    },
    /// Set LED strip brightness (0-100).
    LedBrightness {
        /// Brightness level.
        value: u8,
    },
    /// Set LED strip colour.
    LedColor {
        /// Colour as `r,g,b`.
        #[arg(value_parser = parse_rgb)]
        color: Rgb,
    },
    /// Select a keyboard lighting effect.
    KeyboardEffect {
        /// Firmware effect number.
        effect: u8,
    },
    /// Set keyboard lighting speed.
    KeyboardSpeed {
        /// Firmware speed step.
        speed: u8,
    },
    /// Set keyboard RGB backlight colour.
    KeyboardColor {
        /// Colour as `r,g,b`.
        #[arg(value_parser = parse_rgb)]
        color: Rgb,
    },
    /// Set keyboard backlight brightness (0-100).
    KeyboardBrightness {
        /// Brightness level.
        value: u8,
    },
    /// Tell the server this controller is leaving.
    Disconnect,
    /// Drive several independent sessions that each paint a key grid.
    Demo {
        /// Number of concurrent sessions.
        #[arg(long, default_value_t = 2)]
        sessions: usize,
        /// Number of keys to paint.
        #[arg(long, default_value_t = 6)]
        keys: u32,
        /// Directory holding `<key>.png` on the server host.
        #[arg(long, default_value = "E:\\img")]
        image_dir: String,
    },
}

impl Action {
    /// Session command for single-shot actions. `None` for [`Action::Demo`].
    pub fn command(&self) -> Option<Command> {
        let command = match self {
            Self::SetKey {
                url,
                key,
                no_refresh,
            } => Command::SetKeyImg {
                url: url.clone(),
                key: *key,
                refresh: !no_refresh,
            },
            Self::SetBackground { url, key } => Command::SetBackgroundImg {
                url: url.clone(),
                key: *key,
            },
            Self::Refresh => Command::Refresh,
            Self::Read => Command::Read,
            Self::Identify => Command::GetDeviceIdentifier,
            Self::Firmware => Command::GetFirmVersion,
            Self::Brightness { value } => Command::SetBrightness(*value),
            Self::LedBrightness { value } => Command::SetLedBrightness(*value),
            Self::LedColor { color } => Command::SetLedColor(*color),
            Self::KeyboardEffect { effect } => Command::SetKeyboardLightingEffects(*effect),
            Self::KeyboardSpeed { speed } => Command::SetKeyboardLightingSpeed(*speed),
            Self::KeyboardColor { color } => Command::SetKeyboardRgbBacklight(*color),
            Self::KeyboardBrightness { value } => Command::SetKeyboardBacklightBrightness(*value),
            Self::Disconnect => Command::Disconnected,
            Self::Demo { .. } => return None,
        };
        Some(command)
    }
}

/// Parse `r,g,b` with each channel in 0-255.
pub fn parse_rgb(value: &str) -> Result<Rgb, String> {
    let channels: Vec<&str> = value.split(',').map(str::trim).collect();
    let [r, g, b] = channels.as_slice() else {
        return Err(format!("expected r,g,b, got {value:?}"));
    };
    let channel = |s: &str| {
        s.parse::<u8>()
            .map_err(|_| format!("colour channel {s:?} is not in 0-255"))
    };
    Ok(Rgb {
        r: channel(*r)?,
        g: channel(*g)?,
        b: channel(*b)?,
    })
}
