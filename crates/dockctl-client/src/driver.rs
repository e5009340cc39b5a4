//! Task that owns one [`Session`](dockctl_core::Session) and its socket.
//!
//! Every session method runs on this task, so the session stays
//! single-threaded even though handles are shared across tasks. Each loop
//! iteration handles one event:
//!
//! 1. flush frames the session queued on its transport
//! 2. run a request from a [`SessionHandle`](crate::SessionHandle)
//! 3. route an inbound WebSocket frame
//! 4. send a keepalive ping when the socket has been idle
//! 5. give up on a close handshake the server never answered

use std::time::Duration;

use dockctl_core::{Command, Phase, ProtocolError};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::transport::Outbound;
use crate::WsSession;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Closure run against the session on the driver task.
pub(crate) type Apply = Box<dyn FnOnce(&mut WsSession) + Send>;

/// Request from a handle to the driver.
pub(crate) enum Request {
    /// Run a dispatcher command and report the outcome.
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), ProtocolError>>,
    },
    /// Run arbitrary setup (observers, continuations) on the session.
    Apply(Apply),
    /// Close without sending `disconnected`.
    Close,
}

/// Point-in-time view of a session, published after every driver step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Server-assigned path, once known.
    pub path: Option<String>,
    /// Connection phase.
    pub phase: Phase,
    /// Commands sent so far.
    pub sent: u64,
    /// Path conflicts the server caused.
    pub consistency_warnings: u64,
}

impl SessionSnapshot {
    pub(crate) fn of(session: &WsSession) -> Self {
        Self {
            path: session.current_path().map(str::to_owned),
            phase: session.current_phase(),
            sent: session.sent_count(),
            consistency_warnings: session.state().consistency_warnings(),
        }
    }
}

/// Driver timing knobs.
pub(crate) struct Timing {
    pub keepalive: Option<Duration>,
    pub close_timeout: Duration,
}

pub(crate) async fn run(
    ws: WsStream,
    mut session: WsSession,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    mut requests: mpsc::Receiver<Request>,
    snapshot: watch::Sender<SessionSnapshot>,
    timing: Timing,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut last_activity = Instant::now();
    let mut close_deadline: Option<Instant> = None;
    let mut handles_gone = false;

    session.on_open();
    publish(&snapshot, &session);

    loop {
        let ping_at = timing.keepalive.map(|interval| last_activity + interval);

        tokio::select! {
            biased;

            Some(frame) = outbound.recv() => match frame {
                Outbound::Text(text) => {
                    if let Err(error) = ws_tx.send(Message::Text(text.into())).await {
                        warn!(%error, "websocket write failed");
                        session.on_error();
                        session.on_close();
                        break;
                    }
                }
                Outbound::Close => {
                    debug!("sending close frame");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    close_deadline = Some(Instant::now() + timing.close_timeout);
                }
            },

            request = requests.recv(), if !handles_gone => match request {
                Some(Request::Command { command, reply }) => {
                    let _ = reply.send(session.execute(&command));
                }
                Some(Request::Apply(apply)) => apply(&mut session),
                Some(Request::Close) => session.close(),
                None => {
                    debug!("all handles dropped, closing");
                    handles_gone = true;
                    session.close();
                }
            },

            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    last_activity = Instant::now();
                    let _ = session.on_text(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => {
                    last_activity = Instant::now();
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed the connection");
                    session.on_close();
                    break;
                }
                Some(Ok(_)) => last_activity = Instant::now(),
                Some(Err(error)) => {
                    warn!(%error, "websocket read failed");
                    session.on_error();
                    session.on_close();
                    break;
                }
                None => {
                    session.on_close();
                    break;
                }
            },

            () = sleep_or_pending(ping_at) => {
                debug!("idle, sending keepalive ping");
                last_activity = Instant::now();
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    session.on_error();
                    session.on_close();
                    break;
                }
            }

            () = sleep_or_pending(close_deadline) => {
                debug!("close handshake timed out");
                session.on_close();
                break;
            }
        }

        publish(&snapshot, &session);
    }

    let _ = ws_tx.close().await;
    publish(&snapshot, &session);
    debug!(sent = session.sent_count(), "session driver stopped");
}

fn publish(snapshot: &watch::Sender<SessionSnapshot>, session: &WsSession) {
    let next = SessionSnapshot::of(session);
    let _ = snapshot.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
