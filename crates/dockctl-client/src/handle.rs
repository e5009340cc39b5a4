//! Cloneable handle for issuing commands to a running session.

use dockctl_core::{Command, Envelope, EventKind, Observer, Phase, Rgb};
use tokio::sync::{mpsc, oneshot, watch};

use crate::driver::{Request, SessionSnapshot};
use crate::errors::ClientError;
use crate::transport::ChannelTransport;
use crate::WsSession;

/// Handle to a session owned by a driver task.
///
/// Clones address the same session. When the last clone is dropped the
/// driver closes the connection.
#[derive(Clone)]
pub struct SessionHandle {
    name: String,
    requests: mpsc::Sender<Request>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("name", &self.name)
            .field("snapshot", &*self.snapshot.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    pub(crate) fn new(
        name: String,
        requests: mpsc::Sender<Request>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            name,
            requests,
            snapshot,
        }
    }

    /// Log label of the session.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Server-assigned path, once known.
    pub fn current_path(&self) -> Option<String> {
        self.snapshot.borrow().path.clone()
    }

    /// Current connection phase.
    pub fn current_phase(&self) -> Phase {
        self.snapshot.borrow().phase
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Run a command on the session and wait for it to be accepted.
    ///
    /// Acceptance means the frame was queued for the socket. The server
    /// sends no acknowledgement.
    pub async fn execute(&self, command: Command) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| ClientError::driver_gone())?;
        rx.await.map_err(|_| ClientError::driver_gone())??;
        Ok(())
    }

    /// `setKeyImg`.
    pub async fn set_key_img(
        &self,
        url: impl Into<String>,
        key: u32,
        refresh: bool,
    ) -> Result<(), ClientError> {
        self.execute(Command::SetKeyImg {
            url: url.into(),
            key,
            refresh,
        })
        .await
    }

    /// `setBackgroundImg`.
    pub async fn set_background_img(
        &self,
        url: impl Into<String>,
        key: u32,
    ) -> Result<(), ClientError> {
        self.execute(Command::SetBackgroundImg {
            url: url.into(),
            key,
        })
        .await
    }

    /// `refresh`.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.execute(Command::Refresh).await
    }

    /// `read`.
    pub async fn read(&self) -> Result<(), ClientError> {
        self.execute(Command::Read).await
    }

    /// `getDeviceIdentifier`.
    pub async fn get_device_identifier(&self) -> Result<(), ClientError> {
        self.execute(Command::GetDeviceIdentifier).await
    }

    /// `getFirmVersion`.
    pub async fn get_firm_version(&self) -> Result<(), ClientError> {
        self.execute(Command::GetFirmVersion).await
    }

    /// `setBrightness`.
    pub async fn set_brightness(&self, brightness: u8) -> Result<(), ClientError> {
        self.execute(Command::SetBrightness(brightness)).await
    }

    /// `setLEDBrightness`.
    pub async fn set_led_brightness(&self, brightness: u8) -> Result<(), ClientError> {
        self.execute(Command::SetLedBrightness(brightness)).await
    }

    /// `setLEDColor`.
    pub async fn set_led_color(&self, color: Rgb) -> Result<(), ClientError> {
        self.execute(Command::SetLedColor(color)).await
    }

    /// `setKeyboardLightingEffects`.
    pub async fn set_keyboard_lighting_effects(&self, effect: u8) -> Result<(), ClientError> {
        self.execute(Command::SetKeyboardLightingEffects(effect)).await
    }

    /// `setKeyboardLightingSpeed`.
    pub async fn set_keyboard_lighting_speed(&self, speed: u8) -> Result<(), ClientError> {
        self.execute(Command::SetKeyboardLightingSpeed(speed)).await
    }

    /// `setKeyboardRGBBacklight`.
    pub async fn set_keyboard_rgb_backlight(&self, color: Rgb) -> Result<(), ClientError> {
        self.execute(Command::SetKeyboardRgbBacklight(color)).await
    }

    /// `setKeyboardBacklightBrightness`.
    pub async fn set_keyboard_backlight_brightness(
        &self,
        brightness: u8,
    ) -> Result<(), ClientError> {
        self.execute(Command::SetKeyboardBacklightBrightness(brightness))
            .await
    }

    /// `disconnected`, then close.
    pub async fn disconnected(&self) -> Result<(), ClientError> {
        self.execute(Command::Disconnected).await
    }

    /// Close without telling the server. A no-op if the driver already stopped.
    pub async fn close(&self) {
        let _ = self.requests.send(Request::Close).await;
    }

    // ─── Routing ─────────────────────────────────────────────────────────

    /// Run `f` against the session on the driver task.
    pub async fn with_session<F>(&self, f: F) -> Result<(), ClientError>
    where
        F: FnOnce(&mut WsSession) + Send + 'static,
    {
        self.requests
            .send(Request::Apply(Box::new(f)))
            .await
            .map_err(|_| ClientError::driver_gone())
    }

    /// Install a closure observer.
    pub async fn set_observer<F>(&self, observer: F) -> Result<(), ClientError>
    where
        F: FnMut(&Envelope, &mut WsSession) + Send + 'static,
    {
        self.with_session(move |session| session.set_observer(observer))
            .await
    }

    /// Install an [`Observer`] implementation.
    pub async fn attach_observer<O>(&self, observer: O) -> Result<(), ClientError>
    where
        O: Observer<ChannelTransport> + Send + 'static,
    {
        self.with_session(move |session| session.attach_observer(observer))
            .await
    }

    /// Run `handler` on the next inbound envelope of kind `expected`.
    pub async fn expect<F>(&self, expected: EventKind, handler: F) -> Result<(), ClientError>
    where
        F: FnOnce(&Envelope, &mut WsSession) + Send + 'static,
    {
        self.with_session(move |session| session.expect(expected, handler))
            .await
    }

    // ─── Waiting ─────────────────────────────────────────────────────────

    /// Wait until the server has assigned a path.
    ///
    /// Fails with `NotConnected` if the session closes first.
    pub async fn wait_for_path(&self) -> Result<String, ClientError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| s.path.is_some() || s.phase == Phase::Closed)
            .await
            .map_err(|_| ClientError::driver_gone())?
            .clone();
        snapshot.path.ok_or_else(ClientError::driver_gone)
    }

    /// Wait until the session reaches `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.snapshot.clone();
        let _ = rx.wait_for(|s| s.phase == Phase::Closed).await;
    }
}
