//! Client error types.

use dockctl_core::{Phase, ProtocolError};
use thiserror::Error;

/// Errors from connecting or from commands issued through a handle.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Endpoint that was dialled.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// The session rejected the command.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Error returned once the driver task has stopped.
    pub(crate) fn driver_gone() -> Self {
        Self::Protocol(ProtocolError::NotConnected {
            phase: Phase::Closed,
        })
    }

    /// Whether this is a `NotConnected` rejection.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::NotConnected { .. }))
    }
}
