//! # dockctl-core
//!
//! Client-side session protocol for driving a StreamDock device through the
//! local control server's WebSocket endpoint.
//!
//! The crate is sans-IO: it never touches a socket. A [`Transport`] supplies
//! the ability to send text and to close, and the owner of a [`Session`]
//! feeds transport notifications back in (`on_open`, `on_text`, `on_error`,
//! `on_close`).
//!
//! - **Envelope codec**: [`Envelope`] and [`EventKind`], the JSON wire unit
//! - **Session state**: [`SessionState`], the server-assigned path and the
//!   connection [`Phase`]
//! - **Command dispatcher**: one method on [`Session`] per catalog event
//! - **Inbound router**: [`Observer`] and one-shot continuations that react
//!   to server messages and may issue further commands
//! - **Errors**: [`ProtocolError`] and [`DecodeError`] via `thiserror`

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod logging;
pub mod payload;
pub mod router;
pub mod state;
pub mod transport;

pub use dispatcher::{Command, Session};
pub use envelope::{CLIENT_EVENTS, Envelope, EventKind};
pub use errors::{DecodeError, ProtocolError, Result};
pub use payload::{Brightness, ImageAssignment, LightingEffect, LightingSpeed, Payload, Rgb};
pub use router::{Continuation, Observer};
pub use state::{PathUpdate, Phase, SessionState};
pub use transport::{MemoryTransport, Transport, TransportError};
