//! [`Transport`] implementation backed by the driver's outbound queue.

use dockctl_core::{Transport, TransportError};
use tokio::sync::mpsc;

/// Frame queued for the WebSocket writer.
#[derive(Debug, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame.
    Text(String),
    /// Start the close handshake.
    Close,
}

/// Transport handed to the [`Session`](dockctl_core::Session) owned by the driver.
///
/// Sends are queued on an unbounded channel and written by the driver loop,
/// so a command never waits on the socket.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
    close_sent: bool,
}

impl ChannelTransport {
    /// Wrap the sending half of the outbound queue.
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            tx,
            close_sent: false,
        }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.close_sent {
            return Err(TransportError::Closed);
        }
        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if !self.close_sent {
            self.close_sent = true;
            let _ = self.tx.send(Outbound::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_text_then_close_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut transport = ChannelTransport::new(tx);
        transport.send("a".into()).unwrap();
        transport.close();
        transport.close();
        assert_eq!(transport.send("b".into()), Err(TransportError::Closed));

        assert_eq!(rx.try_recv().unwrap(), Outbound::Text("a".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_receiver_dropped_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut transport = ChannelTransport::new(tx);
        assert_eq!(transport.send("a".into()), Err(TransportError::Closed));
    }
}
