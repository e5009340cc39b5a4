//! Single-command runs: connect, establish the path, act, disconnect.

use std::time::Duration;

use anyhow::{Context, Result};
use dockctl_client::{ClientConfig, SessionHandle, WsSession, connect_with};
use dockctl_core::{Command, Envelope};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Run `command` on a fresh session and print any reply to stdout.
pub async fn run(config: &ClientConfig, command: Command, wait: Duration) -> Result<()> {
    let (replies_tx, mut replies) = mpsc::unbounded_channel::<Envelope>();
    let handle = connect_with(config, move |session: &mut WsSession| {
        session.set_observer(move |envelope: &Envelope, _: &mut WsSession| {
            let _ = replies_tx.send(envelope.clone());
        });
    })
    .await?;

    let bootstrap = establish(&handle, &mut replies, wait).await?;

    match &command {
        Command::Read => print_reply(bootstrap.as_ref()),
        Command::Disconnected => {}
        query if query.event().is_query() => {
            handle.execute(query.clone()).await?;
            let reply = timeout(wait, replies.recv())
                .await
                .with_context(|| format!("timed out waiting for a {} reply", query.event()))?;
            print_reply(reply.as_ref());
        }
        other => handle.execute(other.clone()).await?,
    }

    handle.disconnected().await?;
    if timeout(wait, handle.closed()).await.is_err() {
        warn!("server did not finish the close handshake in time");
    }
    Ok(())
}

/// Send the bootstrap `read` and wait for the server to assign a path.
/// Returns the reply that carried it.
async fn establish(
    handle: &SessionHandle,
    replies: &mut mpsc::UnboundedReceiver<Envelope>,
    wait: Duration,
) -> Result<Option<Envelope>> {
    handle.read().await?;
    let path = timeout(wait, handle.wait_for_path())
        .await
        .context("timed out waiting for the server to assign a session path")??;
    info!(%path, "session established");

    let mut carrier = None;
    while let Ok(envelope) = replies.try_recv() {
        if envelope.path.is_some() {
            carrier = Some(envelope);
        }
    }
    Ok(carrier)
}

fn print_reply(envelope: Option<&Envelope>) {
    match envelope {
        Some(envelope) => println!("{}", envelope.encode()),
        None => warn!("no reply received"),
    }
}
