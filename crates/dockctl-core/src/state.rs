//! Session phase and the server-assigned path.
//!
//! Phase transitions:
//! ```text
//! Connecting --open--> Open --error--> Closing --close--> Closed
//!                      Open --local close request--> Closing
//!                      Open --close--> Closed
//! ```
//! `Closed` is terminal. A new session is needed to reconnect.

use std::fmt;

use tracing::{debug, warn};

use crate::envelope::Envelope;

/// Connection phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Transport is connecting.
    Connecting,
    /// Transport reported open; commands are accepted.
    Open,
    /// Close requested or transport failed; waiting for close.
    Closing,
    /// Transport closed. Terminal.
    Closed,
}

impl Phase {
    /// Lowercase name used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effect of an inbound message on the session path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathUpdate {
    /// No path in the message, or the same path as before.
    Unchanged,
    /// First path seen for this session.
    Assigned,
    /// The server sent a different path; the new one replaced `previous`.
    Replaced {
        /// Path held before this message.
        previous: String,
    },
}

/// Mutable state of one session: the path and the phase.
#[derive(Debug)]
pub struct SessionState {
    path: Option<String>,
    phase: Phase,
    consistency_warnings: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Fresh state in the `Connecting` phase with no path.
    pub fn new() -> Self {
        Self {
            path: None,
            phase: Phase::Connecting,
            consistency_warnings: 0,
        }
    }

    /// Transport reported open.
    pub fn on_open(&mut self) {
        match self.phase {
            Phase::Connecting => self.set_phase(Phase::Open),
            Phase::Open => {}
            Phase::Closing | Phase::Closed => {
                warn!(phase = %self.phase, "open notification after close, ignoring");
            }
        }
    }

    /// Record the path carried by an inbound message.
    ///
    /// The first non-null path is adopted. A different non-null path later
    /// on is a protocol-consistency violation: it is logged and counted, and
    /// the new path wins because the server is authoritative.
    pub fn on_message(&mut self, envelope: &Envelope) -> PathUpdate {
        let Some(incoming) = envelope.path.as_deref() else {
            return PathUpdate::Unchanged;
        };
        match self.path.as_deref() {
            None => {
                debug!(path = incoming, "session path assigned");
                self.path = Some(incoming.to_owned());
                PathUpdate::Assigned
            }
            Some(current) if current == incoming => PathUpdate::Unchanged,
            Some(current) => {
                self.consistency_warnings += 1;
                warn!(
                    previous = current,
                    path = incoming,
                    event = %envelope.event,
                    "protocol consistency: server changed the session path"
                );
                let previous = current.to_owned();
                self.path = Some(incoming.to_owned());
                PathUpdate::Replaced { previous }
            }
        }
    }

    /// Transport reported an error.
    pub fn on_error(&mut self) {
        if matches!(self.phase, Phase::Connecting | Phase::Open) {
            self.set_phase(Phase::Closing);
        }
    }

    /// Local close request (explicit close or `disconnected`).
    pub fn begin_close(&mut self) {
        if self.phase == Phase::Open {
            self.set_phase(Phase::Closing);
        }
    }

    /// Transport reported closed.
    pub fn on_close(&mut self) {
        if self.phase != Phase::Closed {
            self.set_phase(Phase::Closed);
        }
    }

    /// Path assigned by the server, if any.
    pub fn current_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Current connection phase.
    pub fn current_phase(&self) -> Phase {
        self.phase
    }

    /// Number of path conflicts observed.
    pub fn consistency_warnings(&self) -> u64 {
        self.consistency_warnings
    }

    fn set_phase(&mut self, next: Phase) {
        debug!(from = %self.phase, to = %next, "session phase");
        self.phase = next;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
