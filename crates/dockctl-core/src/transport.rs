//! Transport capability required by a [`Session`](crate::Session).
//!
//! The session only needs to hand off outbound text and to request a close.
//! Inbound traffic and open/error/close notifications are pushed into the
//! session by whoever owns the socket.

use thiserror::Error;

/// Errors reported by a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The underlying connection is gone.
    #[error("transport closed")]
    Closed,
    /// The transport could not accept the message.
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Outbound half of a duplex message channel.
///
/// `send` must not wait for delivery: the protocol has no acknowledgement,
/// so an accepted message is the end of the sender's responsibility.
pub trait Transport {
    /// Queue a text frame for sending.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Ask the transport to close. Completion is reported separately.
    fn close(&mut self);
}

/// Transport that records frames in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<String>,
    close_requested: bool,
}

impl MemoryTransport {
    /// Empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Remove and return the recorded frames.
    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }

    /// Whether `close` was called.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.close_requested {
            return Err(TransportError::Closed);
        }
        self.sent.push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.close_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut transport = MemoryTransport::new();
        transport.send("a".into()).unwrap();
        transport.send("b".into()).unwrap();
        assert_eq!(transport.sent(), ["a", "b"]);
        assert_eq!(transport.take_sent().len(), 2);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn send_after_close_fails() {
        let mut transport = MemoryTransport::new();
        transport.close();
        assert!(transport.close_requested());
        assert_eq!(transport.send("a".into()), Err(TransportError::Closed));
    }
}
