//! Several independent sessions, each painting a key grid once the server
//! has assigned its path.

use std::time::Duration;

use anyhow::{Context, Result};
use dockctl_client::{ClientConfig, WsSession, connect_with};
use dockctl_core::{Envelope, Session, Transport};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::info;

/// Demo parameters.
#[derive(Clone, Debug)]
pub struct DemoPlan {
    /// Number of concurrent sessions.
    pub sessions: usize,
    /// Keys `1..=keys` get an image.
    pub keys: u32,
    /// Directory on the server host holding `<key>.png`.
    pub image_dir: String,
}

/// Run every session to completion. Fails if any session fails.
pub async fn run(config: &ClientConfig, plan: &DemoPlan, wait: Duration) -> Result<()> {
    let runs = (0..plan.sessions).map(|index| {
        let config = config
            .clone()
            .with_name(format!("{}-{index}", config.name));
        let plan = plan.clone();
        async move { paint(config, plan, wait).await }
    });
    let paths = futures::future::try_join_all(runs).await?;
    info!(sessions = paths.len(), ?paths, "demo finished");
    Ok(())
}

async fn paint(config: ClientConfig, plan: DemoPlan, wait: Duration) -> Result<String> {
    let (done_tx, done_rx) = oneshot::channel();
    let mut done_tx = Some(done_tx);
    let DemoPlan {
        keys, image_dir, ..
    } = plan;

    let handle = connect_with(&config, move |session: &mut WsSession| {
        session.set_observer(move |_: &Envelope, session: &mut WsSession| {
            if session.current_path().is_none() {
                return;
            }
            if let Some(done) = done_tx.take() {
                let _ = done.send(paint_keys(session, keys, &image_dir));
            }
        });
    })
    .await?;

    handle.read().await?;
    let painted = timeout(wait, done_rx)
        .await
        .with_context(|| format!("{}: timed out waiting for the device", config.name))?
        .with_context(|| format!("{}: session closed before the device answered", config.name))?;
    painted.with_context(|| format!("{}: painting keys failed", config.name))?;

    let path = handle.current_path().unwrap_or_default();
    info!(session = %config.name, %path, keys, "keys painted");
    handle.disconnected().await?;
    let _ = timeout(wait, handle.closed()).await;
    Ok(path)
}

/// Assign `<image_dir>\<key>.png` to every key, redraw once, then ask for
/// the firmware version.
fn paint_keys<T: Transport>(
    session: &mut Session<T>,
    keys: u32,
    image_dir: &str,
) -> dockctl_core::Result<()> {
    for key in 1..=keys {
        session.set_key_img(format!("{image_dir}\\{key}.png"), key, false)?;
    }
    session.refresh()?;
    session.get_firm_version()
}
