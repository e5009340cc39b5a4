//! Error taxonomy for the session protocol.
//!
//! - [`DecodeError`]: inbound bytes that are not a well-formed envelope.
//!   The router logs these and drops the message; the session continues.
//! - [`ProtocolError`]: local precondition failures on dispatcher calls,
//!   surfaced synchronously. No bytes reach the transport when one is
//!   returned, except for [`ProtocolError::Transport`].

use thiserror::Error;

use crate::state::Phase;
use crate::transport::TransportError;

/// Failure to decode an inbound message into an [`Envelope`](crate::Envelope).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON value is not an object.
    #[error("envelope must be a JSON object, got {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// The object has no `event` field.
    #[error("envelope is missing the `event` field")]
    MissingEvent,

    /// A reserved field has the wrong JSON type.
    #[error("envelope field `{field}` must be {expected}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },
}

/// Errors returned by [`Session`](crate::Session) command operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The session is not in the `Open` phase.
    #[error("session is not connected (phase: {phase})")]
    NotConnected {
        /// Phase at the time of the call.
        phase: Phase,
    },

    /// No path has been assigned by the server yet.
    #[error("session not established: no path assigned before `{event}`")]
    SessionNotEstablished {
        /// Event tag that was rejected.
        event: String,
    },

    /// The command payload failed structural validation.
    #[error("invalid payload for `{event}`: {reason}")]
    InvalidPayload {
        /// Event tag that was rejected.
        event: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The transport refused the outbound message.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ProtocolError {
    /// Whether this error was raised locally without any network effect.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn not_connected_display_names_phase() {
        let err = ProtocolError::NotConnected {
            phase: Phase::Closed,
        };
        assert_eq!(err.to_string(), "session is not connected (phase: closed)");
    }

    #[test]
    fn session_not_established_display() {
        let err = ProtocolError::SessionNotEstablished {
            event: "refresh".into(),
        };
        assert!(err.to_string().contains("`refresh`"));
    }

    #[test]
    fn transport_error_converts() {
        let err: ProtocolError = TransportError::Closed.into();
        assert_matches!(err, ProtocolError::Transport(TransportError::Closed));
        assert!(!err.is_local());
    }

    #[test]
    fn precondition_errors_are_local() {
        let err = ProtocolError::InvalidPayload {
            event: "setKeyImg".into(),
            reason: "empty url".into(),
        };
        assert!(err.is_local());
    }

    #[test]
    fn json_decode_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: DecodeError = json_err.into();
        assert_matches!(err, DecodeError::Json(_));
        assert!(err.to_string().starts_with("invalid JSON"));
    }
}
