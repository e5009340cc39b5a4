//! Typed payloads for command envelopes.

use serde::{Deserialize, Serialize};

/// Structural validation applied before a payload is sent.
pub trait Payload: Serialize {
    /// Return a human-readable reason when the payload is malformed.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Image assignment for `setKeyImg` and `setBackgroundImg`.
///
/// `url` is a filesystem path on the machine running the control server.
/// It is passed through verbatim: no normalization of separators, no
/// transcoding of non-ASCII names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAssignment {
    /// Image location.
    pub url: String,
    /// Key slot. The server ignores it for the background image.
    pub key: u32,
    /// Redraw immediately; only sent with `setKeyImg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<bool>,
}

impl ImageAssignment {
    /// Assignment for a key slot.
    pub fn key(url: impl Into<String>, key: u32, refresh: bool) -> Self {
        Self {
            url: url.into(),
            key,
            refresh: Some(refresh),
        }
    }

    /// Assignment for the background slot.
    pub fn background(url: impl Into<String>, key: u32) -> Self {
        Self {
            url: url.into(),
            key,
            refresh: None,
        }
    }
}

impl Payload for ImageAssignment {
    fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("url must not be empty".into());
        }
        Ok(())
    }
}

/// Percentage brightness for the screen or LED strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brightness {
    /// 0 (off) to 100 (full).
    pub brightness: u8,
}

/// Highest accepted brightness value.
pub const MAX_BRIGHTNESS: u8 = 100;

impl Payload for Brightness {
    fn validate(&self) -> Result<(), String> {
        if self.brightness > MAX_BRIGHTNESS {
            return Err(format!(
                "brightness {} exceeds {MAX_BRIGHTNESS}",
                self.brightness
            ));
        }
        Ok(())
    }
}

/// 24-bit colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Payload for Rgb {}

/// Keyboard lighting effect index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingEffect {
    /// Firmware-defined effect number.
    pub effect: u8,
}

impl Payload for LightingEffect {}

/// Keyboard lighting animation speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingSpeed {
    /// Firmware-defined speed step.
    pub speed: u8,
}

impl Payload for LightingSpeed {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_assignment_serializes_refresh() {
        let value = serde_json::to_value(ImageAssignment::key("a.png", 3, false)).unwrap();
        assert_eq!(value, json!({"url": "a.png", "key": 3, "refresh": false}));
    }

    #[test]
    fn background_assignment_omits_refresh() {
        let value = serde_json::to_value(ImageAssignment::background("E:\\img\\bg.jpg", 1)).unwrap();
        assert_eq!(value, json!({"url": "E:\\img\\bg.jpg", "key": 1}));
    }

    #[test]
    fn empty_url_is_invalid() {
        assert!(ImageAssignment::key("", 1, true).validate().is_err());
        assert!(ImageAssignment::background("", 1).validate().is_err());
    }

    #[test]
    fn url_is_passed_through_verbatim() {
        let assignment = ImageAssignment::key("  ", 1, false);
        assert!(assignment.validate().is_ok());
        assert_eq!(serde_json::to_value(&assignment).unwrap()["url"], "  ");
    }

    #[test]
    fn brightness_range() {
        assert!(Brightness { brightness: 0 }.validate().is_ok());
        assert!(Brightness { brightness: 100 }.validate().is_ok());
        let err = Brightness { brightness: 101 }.validate().unwrap_err();
        assert_eq!(err, "brightness 101 exceeds 100");
    }

    #[test]
    fn rgb_wire_shape() {
        let value = serde_json::to_value(Rgb { r: 255, g: 0, b: 0 }).unwrap();
        assert_eq!(value, json!({"r": 255, "g": 0, "b": 0}));
    }

    #[test]
    fn negative_key_is_rejected_by_decoding() {
        let result = serde_json::from_value::<ImageAssignment>(json!({"url": "a", "key": -1}));
        assert!(result.is_err());
    }
}
