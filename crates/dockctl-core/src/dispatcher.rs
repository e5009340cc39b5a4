//! Command dispatcher: the public API of a session.
//!
//! Each catalog event has one method on [`Session`]. Every method checks,
//! in order:
//!
//! 1. the phase is `Open`, else [`ProtocolError::NotConnected`];
//! 2. a path is known, else [`ProtocolError::SessionNotEstablished`]. The
//!    single exception is the first query sent before any path arrives,
//!    which goes out with `"path": null` so the server can answer with one;
//! 3. the payload is structurally valid, else [`ProtocolError::InvalidPayload`].
//!
//! Only then is the envelope encoded and handed to the transport. Sends are
//! fire-and-forget: there is no acknowledgement and nothing is retried.

use tracing::debug;

use crate::envelope::{Envelope, EventKind};
use crate::errors::{ProtocolError, Result};
use crate::payload::{Brightness, ImageAssignment, LightingEffect, LightingSpeed, Payload, Rgb};
use crate::router::{Continuation, Observer};
use crate::state::{Phase, SessionState};
use crate::transport::Transport;

/// One controller-to-device binding over a single transport.
///
/// A session owns its state exclusively; independent sessions share
/// nothing. All methods take `&mut self`, so a session lives on a single
/// logical execution context and needs no locking.
pub struct Session<T: Transport> {
    pub(crate) name: String,
    pub(crate) state: SessionState,
    pub(crate) transport: T,
    pub(crate) observer: Option<Box<dyn Observer<T> + Send>>,
    pub(crate) observer_epoch: u64,
    pub(crate) pending: Option<Continuation<T>>,
    bootstrap_query_sent: bool,
    sent: u64,
}

/// A dispatcher operation as data, for callers that queue commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `setKeyImg`.
    SetKeyImg {
        /// Image path on the server host.
        url: String,
        /// Key slot.
        key: u32,
        /// Redraw immediately.
        refresh: bool,
    },
    /// `setBackgroundImg`.
    SetBackgroundImg {
        /// Image path on the server host.
        url: String,
        /// Slot number, ignored by the server.
        key: u32,
    },
    /// `refresh`.
    Refresh,
    /// `read`.
    Read,
    /// `getDeviceIdentifier`.
    GetDeviceIdentifier,
    /// `getFirmVersion`.
    GetFirmVersion,
    /// `setBrightness`.
    SetBrightness(u8),
    /// `setLEDBrightness`.
    SetLedBrightness(u8),
    /// `setLEDColor`.
    SetLedColor(Rgb),
    /// `setKeyboardLightingEffects`.
    SetKeyboardLightingEffects(u8),
    /// `setKeyboardLightingSpeed`.
    SetKeyboardLightingSpeed(u8),
    /// `setKeyboardRGBBacklight`.
    SetKeyboardRgbBacklight(Rgb),
    /// `setKeyboardBacklightBrightness`.
    SetKeyboardBacklightBrightness(u8),
    /// `disconnected`.
    Disconnected,
}

impl Command {
    /// Event this command emits.
    pub fn event(&self) -> EventKind {
        match self {
            Self::SetKeyImg { .. } => EventKind::SetKeyImg,
            Self::SetBackgroundImg { .. } => EventKind::SetBackgroundImg,
            Self::Refresh => EventKind::Refresh,
            Self::Read => EventKind::Read,
            Self::GetDeviceIdentifier => EventKind::GetDeviceIdentifier,
            Self::GetFirmVersion => EventKind::GetFirmVersion,
            Self::SetBrightness(_) => EventKind::SetBrightness,
            Self::SetLedBrightness(_) => EventKind::SetLedBrightness,
            Self::SetLedColor(_) => EventKind::SetLedColor,
            Self::SetKeyboardLightingEffects(_) => EventKind::SetKeyboardLightingEffects,
            Self::SetKeyboardLightingSpeed(_) => EventKind::SetKeyboardLightingSpeed,
            Self::SetKeyboardRgbBacklight(_) => EventKind::SetKeyboardRgbBacklight,
            Self::SetKeyboardBacklightBrightness(_) => EventKind::SetKeyboardBacklightBrightness,
            Self::Disconnected => EventKind::Disconnected,
        }
    }
}

impl<T: Transport> Session<T> {
    /// Create a session in the `Connecting` phase.
    ///
    /// `name` only labels log lines.
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self {
            name: name.into(),
            state: SessionState::new(),
            transport,
            observer: None,
            observer_epoch: 0,
            pending: None,
            bootstrap_query_sent: false,
            sent: 0,
        }
    }

    /// Log label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path and phase.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Path assigned by the server, if any.
    pub fn current_path(&self) -> Option<&str> {
        self.state.current_path()
    }

    /// Current connection phase.
    pub fn current_phase(&self) -> Phase {
        self.state.current_phase()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Number of envelopes handed to the transport.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    // ─── Display ─────────────────────────────────────────────────────────

    /// Assign an image to key slot `key`.
    pub fn set_key_img(&mut self, url: impl Into<String>, key: u32, refresh: bool) -> Result<()> {
        let assignment = ImageAssignment::key(url, key, refresh);
        self.send_with(EventKind::SetKeyImg, &assignment)
    }

    /// Assign the background (boot logo) image.
    pub fn set_background_img(&mut self, url: impl Into<String>, key: u32) -> Result<()> {
        let assignment = ImageAssignment::background(url, key);
        self.send_with(EventKind::SetBackgroundImg, &assignment)
    }

    /// Force a redraw. Every call sends a new message.
    pub fn refresh(&mut self) -> Result<()> {
        self.send_bare(EventKind::Refresh)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Request current device state.
    pub fn read(&mut self) -> Result<()> {
        self.send_bare(EventKind::Read)
    }

    /// Request the device's stable identifier.
    pub fn get_device_identifier(&mut self) -> Result<()> {
        self.send_bare(EventKind::GetDeviceIdentifier)
    }

    /// Request the firmware version.
    pub fn get_firm_version(&mut self) -> Result<()> {
        self.send_bare(EventKind::GetFirmVersion)
    }

    // ─── Lighting ────────────────────────────────────────────────────────

    /// Set screen brightness (0-100).
    pub fn set_brightness(&mut self, brightness: u8) -> Result<()> {
        self.send_with(EventKind::SetBrightness, &Brightness { brightness })
    }

    /// Set LED strip brightness (0-100).
    pub fn set_led_brightness(&mut self, brightness: u8) -> Result<()> {
        self.send_with(EventKind::SetLedBrightness, &Brightness { brightness })
    }

    /// Set LED strip colour.
    pub fn set_led_color(&mut self, color: Rgb) -> Result<()> {
        self.send_with(EventKind::SetLedColor, &color)
    }

    /// Select a keyboard lighting effect.
    pub fn set_keyboard_lighting_effects(&mut self, effect: u8) -> Result<()> {
        self.send_with(
            EventKind::SetKeyboardLightingEffects,
            &LightingEffect { effect },
        )
    }

    /// Set the keyboard lighting speed.
    pub fn set_keyboard_lighting_speed(&mut self, speed: u8) -> Result<()> {
        self.send_with(EventKind::SetKeyboardLightingSpeed, &LightingSpeed { speed })
    }

    /// Set the keyboard RGB backlight colour.
    pub fn set_keyboard_rgb_backlight(&mut self, color: Rgb) -> Result<()> {
        self.send_with(EventKind::SetKeyboardRgbBacklight, &color)
    }

    /// Set the keyboard backlight brightness.
    pub fn set_keyboard_backlight_brightness(&mut self, brightness: u8) -> Result<()> {
        self.send_with(
            EventKind::SetKeyboardBacklightBrightness,
            &Brightness { brightness },
        )
    }

    // ─── Teardown ────────────────────────────────────────────────────────

    /// Send `disconnected`, then close the transport.
    ///
    /// The phase moves to `Closing` right away so that later commands fail
    /// fast; it reaches `Closed` once the transport reports closure.
    pub fn disconnected(&mut self) -> Result<()> {
        self.send_bare(EventKind::Disconnected)?;
        self.close();
        Ok(())
    }

    /// Close the transport without telling the server.
    pub fn close(&mut self) {
        if self.state.current_phase() == Phase::Open {
            self.state.begin_close();
            self.transport.close();
        }
    }

    /// Run a queued [`Command`].
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::SetKeyImg { url, key, refresh } => {
                self.set_key_img(url.clone(), *key, *refresh)
            }
            Command::SetBackgroundImg { url, key } => self.set_background_img(url.clone(), *key),
            Command::Refresh => self.refresh(),
            Command::Read => self.read(),
            Command::GetDeviceIdentifier => self.get_device_identifier(),
            Command::GetFirmVersion => self.get_firm_version(),
            Command::SetBrightness(v) => self.set_brightness(*v),
            Command::SetLedBrightness(v) => self.set_led_brightness(*v),
            Command::SetLedColor(c) => self.set_led_color(*c),
            Command::SetKeyboardLightingEffects(v) => self.set_keyboard_lighting_effects(*v),
            Command::SetKeyboardLightingSpeed(v) => self.set_keyboard_lighting_speed(*v),
            Command::SetKeyboardRgbBacklight(c) => self.set_keyboard_rgb_backlight(*c),
            Command::SetKeyboardBacklightBrightness(v) => {
                self.set_keyboard_backlight_brightness(*v)
            }
            Command::Disconnected => self.disconnected(),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn preflight(&self, event: &EventKind) -> Result<Option<String>> {
        let phase = self.state.current_phase();
        if phase != Phase::Open {
            return Err(ProtocolError::NotConnected { phase });
        }
        match self.state.current_path() {
            Some(path) => Ok(Some(path.to_owned())),
            None if event.is_query() && !self.bootstrap_query_sent => Ok(None),
            None => Err(ProtocolError::SessionNotEstablished {
                event: event.to_string(),
            }),
        }
    }

    fn send_bare(&mut self, event: EventKind) -> Result<()> {
        let path = self.preflight(&event)?;
        self.submit(Envelope::new(event, path))
    }

    fn send_with<P: Payload>(&mut self, event: EventKind, payload: &P) -> Result<()> {
        let path = self.preflight(&event)?;
        let invalid = |reason: String| ProtocolError::InvalidPayload {
            event: event.to_string(),
            reason,
        };
        payload.validate().map_err(invalid)?;
        let value = serde_json::to_value(payload).map_err(|e| invalid(e.to_string()))?;
        self.submit(Envelope::new(event, path).with_payload(value))
    }

    fn submit(&mut self, envelope: Envelope) -> Result<()> {
        self.transport.send(envelope.encode())?;
        if envelope.path.is_none() {
            self.bootstrap_query_sent = true;
        }
        self.sent += 1;
        debug!(
            session = %self.name,
            event = %envelope.event,
            path = envelope.path.as_deref().unwrap_or("null"),
            "command sent"
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::CLIENT_EVENTS;
    use crate::transport::MemoryTransport;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn open_session() -> Session<MemoryTransport> {
        let mut session = Session::new("test", MemoryTransport::new());
        session.on_open();
        session
    }

    fn established(path: &str) -> Session<MemoryTransport> {
        let mut session = open_session();
        let _ = session.on_text(&format!(r#"{{"path":"{path}"}}"#));
        session
    }

    fn every_command() -> Vec<Command> {
        vec![
            Command::SetKeyImg {
                url: "a.png".into(),
                key: 1,
                refresh: true,
            },
            Command::SetBackgroundImg {
                url: "bg.png".into(),
                key: 1,
            },
            Command::Refresh,
            Command::Read,
            Command::GetDeviceIdentifier,
            Command::GetFirmVersion,
            Command::SetBrightness(50),
            Command::SetLedBrightness(50),
            Command::SetLedColor(Rgb { r: 1, g: 2, b: 3 }),
            Command::SetKeyboardLightingEffects(2),
            Command::SetKeyboardLightingSpeed(6),
            Command::SetKeyboardRgbBacklight(Rgb::default()),
            Command::SetKeyboardBacklightBrightness(6),
            Command::Disconnected,
        ]
    }

    fn sent(session: &Session<MemoryTransport>) -> Vec<Envelope> {
        session
            .transport()
            .sent()
            .iter()
            .map(|text| Envelope::decode(text).unwrap())
            .collect()
    }

    #[test]
    fn commands_cover_catalog() {
        let events: Vec<EventKind> = every_command().iter().map(Command::event).collect();
        assert_eq!(events, CLIENT_EVENTS);
    }

    // ── phase precondition ──────────────────────────────────────────

    #[test]
    fn every_command_rejected_while_connecting() {
        let mut session = Session::new("test", MemoryTransport::new());
        for command in every_command() {
            assert_matches!(
                session.execute(&command),
                Err(ProtocolError::NotConnected {
                    phase: Phase::Connecting
                })
            );
        }
        assert!(session.transport().sent().is_empty());
    }

    #[test]
    fn every_command_rejected_after_close() {
        let mut session = established("S1");
        session.on_close();
        for command in every_command() {
            assert_matches!(
                session.execute(&command),
                Err(ProtocolError::NotConnected {
                    phase: Phase::Closed
                })
            );
        }
        assert!(session.transport().sent().is_empty());
    }

    #[test]
    fn transport_error_closes_then_rejects() {
        let mut session = established("S1");
        session.on_error();
        assert_eq!(session.current_phase(), Phase::Closing);
        assert!(session.transport().close_requested());
        assert_matches!(
            session.refresh(),
            Err(ProtocolError::NotConnected {
                phase: Phase::Closing
            })
        );
        session.on_close();
        assert_eq!(session.current_phase(), Phase::Closed);
        assert_matches!(
            session.read(),
            Err(ProtocolError::NotConnected {
                phase: Phase::Closed
            })
        );
        assert!(session.transport().sent().is_empty());
    }

    // ── path precondition ───────────────────────────────────────────

    #[test]
    fn non_query_commands_need_a_path() {
        let mut session = open_session();
        for command in every_command()
            .into_iter()
            .filter(|c| !c.event().is_query())
        {
            assert_matches!(
                session.execute(&command),
                Err(ProtocolError::SessionNotEstablished { .. })
            );
        }
        assert!(session.transport().sent().is_empty());
    }

    #[test]
    fn first_read_goes_out_with_null_path() {
        let mut session = open_session();
        session.read().unwrap();

        let frames = session.transport().sent();
        assert_eq!(frames.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(value, json!({"event": "read", "path": null}));
    }

    #[test]
    fn only_one_pathless_query_is_allowed() {
        let mut session = open_session();
        session.read().unwrap();
        assert_matches!(
            session.read(),
            Err(ProtocolError::SessionNotEstablished { event }) if event == "read"
        );
        assert_matches!(
            session.get_device_identifier(),
            Err(ProtocolError::SessionNotEstablished { .. })
        );
        assert_eq!(session.sent_count(), 1);
    }

    #[test]
    fn reply_path_is_used_by_later_commands() {
        let mut session = open_session();
        session.read().unwrap();
        let _ = session.on_text(r#"{"path":"S1","state":{"keys":15}}"#);
        assert_eq!(session.current_path(), Some("S1"));

        session.refresh().unwrap();
        let last = sent(&session).pop().unwrap();
        assert_eq!(last.path.as_deref(), Some("S1"));
    }

    // ── payloads ────────────────────────────────────────────────────

    #[test]
    fn set_key_img_payload() {
        let mut session = established("S1");
        session.set_key_img("E:\\img\\中文.jpg", 1, true).unwrap();

        let frames = sent(&session);
        assert_eq!(frames.len(), 1);
        let expected = Envelope::new(EventKind::SetKeyImg, Some("S1".into()))
            .with_payload(json!({"url": "E:\\img\\中文.jpg", "key": 1, "refresh": true}));
        assert_eq!(frames[0], expected);
    }

    #[test]
    fn set_background_img_payload_has_no_refresh() {
        let mut session = established("S1");
        session.set_background_img("E:\\img\\bg.jpg", 1).unwrap();
        let frame = sent(&session).pop().unwrap();
        assert_eq!(frame.event, EventKind::SetBackgroundImg);
        assert_eq!(frame.payload, Some(json!({"url": "E:\\img\\bg.jpg", "key": 1})));
    }

    #[test]
    fn empty_url_is_invalid_payload() {
        let mut session = established("S1");
        assert_matches!(
            session.set_key_img("", 1, true),
            Err(ProtocolError::InvalidPayload { event, .. }) if event == "setKeyImg"
        );
        assert_matches!(
            session.set_background_img("", 1),
            Err(ProtocolError::InvalidPayload { .. })
        );
        assert!(session.transport().sent().is_empty());
    }

    #[test]
    fn brightness_over_range_is_invalid_payload() {
        let mut session = established("S1");
        assert_matches!(
            session.set_brightness(150),
            Err(ProtocolError::InvalidPayload { .. })
        );
        session.set_brightness(100).unwrap();
        assert_eq!(
            sent(&session)[0].payload,
            Some(json!({"brightness": 100}))
        );
    }

    #[test]
    fn led_color_payload() {
        let mut session = established("S1");
        session.set_led_color(Rgb { r: 255, g: 0, b: 0 }).unwrap();
        let frame = &session.transport().sent()[0];
        assert_eq!(
            frame,
            r#"{"event":"setLEDColor","path":"S1","payload":{"r":255,"g":0,"b":0}}"#
        );
    }

    #[test]
    fn control_events_carry_no_payload() {
        let mut session = established("S1");
        session.refresh().unwrap();
        session.get_device_identifier().unwrap();
        assert!(sent(&session).iter().all(|e| e.payload.is_none()));
    }

    // ── sequencing ──────────────────────────────────────────────────

    #[test]
    fn refresh_twice_sends_twice() {
        let mut session = established("S1");
        session.refresh().unwrap();
        session.refresh().unwrap();
        let frames = sent(&session);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|e| e.event == EventKind::Refresh));
    }

    #[test]
    fn disconnected_sends_then_closes() {
        let mut session = established("S1");
        session.disconnected().unwrap();
        assert_eq!(sent(&session)[0].event, EventKind::Disconnected);
        assert!(session.transport().close_requested());
        assert_eq!(session.current_phase(), Phase::Closing);
        assert_matches!(session.refresh(), Err(ProtocolError::NotConnected { .. }));
        session.on_close();
        assert_eq!(session.current_phase(), Phase::Closed);
    }

    #[test]
    fn close_is_local_only() {
        let mut session = established("S1");
        session.close();
        session.close();
        assert!(session.transport().sent().is_empty());
        assert_eq!(session.current_phase(), Phase::Closing);
    }

    #[test]
    fn independent_sessions_do_not_share_paths() {
        let mut first = established("A");
        let mut second = established("B");
        first.refresh().unwrap();
        second.refresh().unwrap();
        assert_eq!(sent(&first)[0].path.as_deref(), Some("A"));
        assert_eq!(sent(&second)[0].path.as_deref(), Some("B"));
    }
}
