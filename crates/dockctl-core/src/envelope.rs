//! The JSON envelope exchanged with the control server.
//!
//! Every message is a single JSON object:
//! ```json
//! { "event": "setKeyImg", "path": "S1", "payload": { "url": "E:\\img\\a.jpg", "key": 1, "refresh": true } }
//! ```
//!
//! `event` tags are camelCase strings matching the control server exactly.
//! Unrecognized tags decode to [`EventKind::Unknown`] and are passed through
//! untouched. Server replies that omit `event` are only accepted by
//! [`Envelope::decode_inbound`], which labels them [`EventKind::Untagged`].

use std::fmt;

use serde_json::{Map, Value};

use crate::errors::DecodeError;

/// Event tag of an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    // ── Display ──────────────────────────────────────────────────────
    /// Assign an image to a key slot.
    SetKeyImg,
    /// Assign the background / boot logo image.
    SetBackgroundImg,
    /// Force a redraw of the current assignments.
    Refresh,

    // ── Queries ──────────────────────────────────────────────────────
    /// Request current device state.
    Read,
    /// Request the device's stable identifier.
    GetDeviceIdentifier,
    /// Request the firmware version string.
    GetFirmVersion,

    // ── Lighting ─────────────────────────────────────────────────────
    /// Set screen brightness.
    SetBrightness,
    /// Set LED strip brightness.
    SetLedBrightness,
    /// Set LED strip colour.
    SetLedColor,
    /// Select a keyboard lighting effect.
    SetKeyboardLightingEffects,
    /// Set the keyboard lighting animation speed.
    SetKeyboardLightingSpeed,
    /// Set the keyboard RGB backlight colour.
    SetKeyboardRgbBacklight,
    /// Set the keyboard backlight brightness.
    SetKeyboardBacklightBrightness,

    // ── Teardown ─────────────────────────────────────────────────────
    /// Explicit session teardown request.
    Disconnected,

    // ── Server → client ──────────────────────────────────────────────
    /// A device is attached; carries the path that binds this session.
    DeviceDidConnect,
    /// Server reply without an `event` field.
    Untagged,
    /// Any tag not in the catalog, preserved verbatim.
    Unknown(String),
}

/// Every event the dispatcher can emit.
pub const CLIENT_EVENTS: &[EventKind] = &[
    EventKind::SetKeyImg,
    EventKind::SetBackgroundImg,
    EventKind::Refresh,
    EventKind::Read,
    EventKind::GetDeviceIdentifier,
    EventKind::GetFirmVersion,
    EventKind::SetBrightness,
    EventKind::SetLedBrightness,
    EventKind::SetLedColor,
    EventKind::SetKeyboardLightingEffects,
    EventKind::SetKeyboardLightingSpeed,
    EventKind::SetKeyboardRgbBacklight,
    EventKind::SetKeyboardBacklightBrightness,
    EventKind::Disconnected,
];

impl EventKind {
    /// Wire tag, or `None` for [`EventKind::Untagged`].
    pub fn tag(&self) -> Option<&str> {
        let tag = match self {
            Self::SetKeyImg => "setKeyImg",
            Self::SetBackgroundImg => "setBackgroundImg",
            Self::Refresh => "refresh",
            Self::Read => "read",
            Self::GetDeviceIdentifier => "getDeviceIdentifier",
            Self::GetFirmVersion => "getFirmVersion",
            Self::SetBrightness => "setBrightness",
            Self::SetLedBrightness => "setLEDBrightness",
            Self::SetLedColor => "setLEDColor",
            Self::SetKeyboardLightingEffects => "setKeyboardLightingEffects",
            Self::SetKeyboardLightingSpeed => "setKeyboardLightingSpeed",
            Self::SetKeyboardRgbBacklight => "setKeyboardRGBBacklight",
            Self::SetKeyboardBacklightBrightness => "setKeyboardBacklightBrightness",
            Self::Disconnected => "disconnected",
            Self::DeviceDidConnect => "deviceDidConnect",
            Self::Untagged => return None,
            Self::Unknown(tag) => tag.as_str(),
        };
        Some(tag)
    }

    /// Parse a wire tag. Never fails; unrecognized tags become [`EventKind::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "setKeyImg" => Self::SetKeyImg,
            "setBackgroundImg" => Self::SetBackgroundImg,
            "refresh" => Self::Refresh,
            "read" => Self::Read,
            "getDeviceIdentifier" => Self::GetDeviceIdentifier,
            "getFirmVersion" => Self::GetFirmVersion,
            "setBrightness" => Self::SetBrightness,
            "setLEDBrightness" => Self::SetLedBrightness,
            "setLEDColor" => Self::SetLedColor,
            "setKeyboardLightingEffects" => Self::SetKeyboardLightingEffects,
            "setKeyboardLightingSpeed" => Self::SetKeyboardLightingSpeed,
            "setKeyboardRGBBacklight" => Self::SetKeyboardRgbBacklight,
            "setKeyboardBacklightBrightness" => Self::SetKeyboardBacklightBrightness,
            "disconnected" => Self::Disconnected,
            "deviceDidConnect" => Self::DeviceDidConnect,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Queries ask the server for state rather than changing it.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::Read | Self::GetDeviceIdentifier | Self::GetFirmVersion
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag().unwrap_or("<untagged>"))
    }
}

/// One protocol message.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Event tag.
    pub event: EventKind,
    /// Session path the event applies to; `None` encodes as `null`.
    pub path: Option<String>,
    /// Event-specific data, absent for control events.
    pub payload: Option<Value>,
    /// Any other top-level fields (server replies put state here).
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope without payload.
    pub fn new(event: EventKind, path: Option<String>) -> Self {
        Self {
            event,
            path,
            payload: None,
            extra: Map::new(),
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Serialize to the wire text.
    ///
    /// `path` is always written, as `null` before the server assigned one.
    /// Strings are emitted verbatim apart from standard JSON escaping.
    pub fn encode(&self) -> String {
        let mut map = Map::with_capacity(3 + self.extra.len());
        if let Some(tag) = self.event.tag() {
            let _ = map.insert("event".into(), Value::String(tag.to_owned()));
        }
        let path = self.path.clone().map_or(Value::Null, Value::String);
        let _ = map.insert("path".into(), path);
        if let Some(payload) = &self.payload {
            let _ = map.insert("payload".into(), payload.clone());
        }
        for (key, value) in &self.extra {
            if !map.contains_key(key) {
                let _ = map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map).to_string()
    }

    /// Strict decode: `event` must be present.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let map = parse_object(text)?;
        if !map.contains_key("event") {
            return Err(DecodeError::MissingEvent);
        }
        from_object(map)
    }

    /// Decode a server message.
    ///
    /// Identical to [`Envelope::decode`], except that an object without
    /// `event` is accepted as [`EventKind::Untagged`] when it carries a
    /// string `path`.
    pub fn decode_inbound(text: &str) -> Result<Self, DecodeError> {
        let map = parse_object(text)?;
        if !map.contains_key("event") && !map.get("path").is_some_and(Value::is_string) {
            return Err(DecodeError::MissingEvent);
        }
        from_object(map)
    }

    /// Deserialize the payload into a typed value, if present.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<Option<T>, DecodeError> {
        self.payload
            .as_ref()
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(DecodeError::from)
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(DecodeError::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

fn from_object(mut map: Map<String, Value>) -> Result<Envelope, DecodeError> {
    let event = match map.remove("event") {
        None => EventKind::Untagged,
        Some(Value::String(tag)) => EventKind::from_tag(&tag),
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "event",
                expected: "a string",
            });
        }
    };
    let path = match map.remove("path") {
        None | Some(Value::Null) => None,
        Some(Value::String(path)) => Some(path),
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "path",
                expected: "a string or null",
            });
        }
    };
    let payload = map.remove("payload");
    Ok(Envelope {
        event,
        path,
        payload,
        extra: map,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
