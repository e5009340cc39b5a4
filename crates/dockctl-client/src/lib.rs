//! # dockctl-client
//!
//! Runs a [`dockctl_core::Session`] over a `tokio-tungstenite` WebSocket.
//!
//! [`connect`] dials the control server and spawns a driver task that owns
//! the session. The returned [`SessionHandle`] is cheap to clone and sends
//! commands to the driver over a channel.
//!
//! ```no_run
//! # async fn demo() -> Result<(), dockctl_client::ClientError> {
//! use dockctl_client::{ClientConfig, connect};
//!
//! let handle = connect(&ClientConfig::default()).await?;
//! handle.read().await?;
//! let _path = handle.wait_for_path().await?;
//! handle.set_key_img("E:\\img\\a.png", 1, true).await?;
//! handle.disconnected().await?;
//! handle.closed().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
mod driver;
pub mod errors;
mod handle;
pub mod transport;

use dockctl_core::Session;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tracing::{Instrument, info, info_span};

pub use config::ClientConfig;
pub use driver::SessionSnapshot;
pub use errors::ClientError;
pub use handle::SessionHandle;
pub use transport::{ChannelTransport, Outbound};

/// Session type owned by the driver task.
pub type WsSession = Session<ChannelTransport>;

/// Connect and start a session.
pub async fn connect(config: &ClientConfig) -> Result<SessionHandle, ClientError> {
    connect_with(config, |_| {}).await
}

/// Connect and start a session, running `setup` on it before the open
/// notification is delivered. Observers installed here see `on_open`.
pub async fn connect_with<F>(config: &ClientConfig, setup: F) -> Result<SessionHandle, ClientError>
where
    F: FnOnce(&mut WsSession),
{
    let (ws, _) = connect_async(config.url.as_str())
        .await
        .map_err(|e| ClientError::Connect {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
    info!(url = %config.url, session = %config.name, "connected");

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let mut session = Session::new(config.name.clone(), ChannelTransport::new(out_tx));
    setup(&mut session);

    let (req_tx, req_rx) = mpsc::channel(config.command_buffer.max(1));
    let (snap_tx, snap_rx) = watch::channel(SessionSnapshot::of(&session));
    let timing = driver::Timing {
        keepalive: config.keepalive,
        close_timeout: config.close_timeout,
    };
    let span = info_span!("session", name = %config.name);
    let _ = tokio::spawn(
        driver::run(ws, session, out_rx, req_rx, snap_tx, timing).instrument(span),
    );

    Ok(SessionHandle::new(config.name.clone(), req_tx, snap_rx))
}
