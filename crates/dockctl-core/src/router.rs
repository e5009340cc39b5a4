//! Inbound router: decode, update state, notify.
//!
//! The wire protocol has no request/response correlation id, so the only
//! way to react to a server reply is to have code waiting for "the next
//! message". Two mechanisms are provided:
//!
//! - a single **observer** slot, notified of every inbound envelope. The
//!   observer may replace itself (or clear the slot) from inside its own
//!   invocation; the replacement takes effect from the next message.
//! - a single **continuation** slot keyed by the expected [`EventKind`],
//!   optionally with a deadline. It fires once, before the observer.
//!
//! Both receive `&mut Session`, so they can issue commands synchronously.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::dispatcher::Session;
use crate::envelope::{Envelope, EventKind};
use crate::errors::DecodeError;
use crate::state::{PathUpdate, Phase};
use crate::transport::Transport;

/// Receives inbound envelopes and lifecycle notifications.
pub trait Observer<T: Transport> {
    /// Called for every decoded inbound envelope.
    fn on_envelope(&mut self, envelope: &Envelope, session: &mut Session<T>);

    /// Called once the transport reports open.
    fn on_open(&mut self, session: &mut Session<T>) {
        let _ = session;
    }

    /// Called once the transport reports closed.
    fn on_close(&mut self, session: &mut Session<T>) {
        let _ = session;
    }
}

impl<T: Transport, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
    fn on_envelope(&mut self, envelope: &Envelope, session: &mut Session<T>) {
        (**self).on_envelope(envelope, session);
    }

    fn on_open(&mut self, session: &mut Session<T>) {
        (**self).on_open(session);
    }

    fn on_close(&mut self, session: &mut Session<T>) {
        (**self).on_close(session);
    }
}

struct FnObserver<F>(F);

impl<T, F> Observer<T> for FnObserver<F>
where
    T: Transport,
    F: FnMut(&Envelope, &mut Session<T>),
{
    fn on_envelope(&mut self, envelope: &Envelope, session: &mut Session<T>) {
        (self.0)(envelope, session);
    }
}

type ContinuationFn<T> = Box<dyn FnOnce(&Envelope, &mut Session<T>) + Send>;

/// One-shot handler waiting for a specific event kind.
pub struct Continuation<T: Transport> {
    expected: EventKind,
    deadline: Option<Instant>,
    handler: ContinuationFn<T>,
}

impl<T: Transport> Continuation<T> {
    /// Event kind this continuation waits for.
    pub fn expected(&self) -> &EventKind {
        &self.expected
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

impl<T: Transport> Session<T> {
    // ─── Observer slot ───────────────────────────────────────────────────

    /// Install a closure as the observer, replacing any previous one.
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&Envelope, &mut Session<T>) + Send + 'static,
    {
        self.attach_observer(FnObserver(observer));
    }

    /// Install an [`Observer`] implementation, replacing any previous one.
    pub fn attach_observer<O>(&mut self, observer: O)
    where
        O: Observer<T> + Send + 'static,
    {
        self.observer_epoch += 1;
        self.observer = Some(Box::new(observer));
    }

    /// Remove the observer.
    pub fn clear_observer(&mut self) {
        self.observer_epoch += 1;
        self.observer = None;
    }

    /// Whether an observer is installed.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    // ─── Continuation slot ───────────────────────────────────────────────

    /// Run `handler` on the next inbound envelope of kind `expected`.
    ///
    /// Replaces any continuation already waiting.
    pub fn expect<F>(&mut self, expected: EventKind, handler: F)
    where
        F: FnOnce(&Envelope, &mut Session<T>) + Send + 'static,
    {
        self.set_pending(expected, None, Box::new(handler));
    }

    /// Like [`Session::expect`], but the continuation is discarded if no
    /// matching envelope arrives within `timeout`.
    pub fn expect_within<F>(&mut self, expected: EventKind, timeout: Duration, handler: F)
    where
        F: FnOnce(&Envelope, &mut Session<T>) + Send + 'static,
    {
        // A timeout too large to represent never expires.
        let deadline = Instant::now().checked_add(timeout);
        self.set_pending(expected, deadline, Box::new(handler));
    }

    /// Drop the waiting continuation, returning whether one was waiting.
    pub fn cancel_expectation(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Event kind the waiting continuation expects, if any. A continuation
    /// past its deadline is not reported.
    pub fn pending_expectation(&self) -> Option<&EventKind> {
        let now = Instant::now();
        self.pending
            .as_ref()
            .filter(|pending| !pending.is_expired(now))
            .map(Continuation::expected)
    }

    fn set_pending(
        &mut self,
        expected: EventKind,
        deadline: Option<Instant>,
        handler: ContinuationFn<T>,
    ) {
        if let Some(previous) = &self.pending {
            debug!(session = %self.name, expected = %previous.expected, "replacing pending continuation");
        }
        self.pending = Some(Continuation {
            expected,
            deadline,
            handler,
        });
    }

    // ─── Transport notifications ─────────────────────────────────────────

    /// Transport reported open.
    pub fn on_open(&mut self) {
        let before = self.state.current_phase();
        self.state.on_open();
        if before == self.state.current_phase() {
            return;
        }
        self.with_observer(|observer, session| observer.on_open(session));
    }

    /// Route one inbound text frame.
    ///
    /// Malformed frames are logged and dropped; the session carries on.
    pub fn on_text(&mut self, text: &str) -> Result<PathUpdate, DecodeError> {
        let envelope = match Envelope::decode_inbound(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(session = %self.name, %error, "dropping undecodable message");
                return Err(error);
            }
        };
        Ok(self.on_envelope(envelope))
    }

    /// Route an already decoded envelope.
    pub fn on_envelope(&mut self, envelope: Envelope) -> PathUpdate {
        let update = self.state.on_message(&envelope);
        debug!(
            session = %self.name,
            event = %envelope.event,
            path = envelope.path.as_deref().unwrap_or("null"),
            "message received"
        );

        if let Some(pending) = self.pending.take() {
            if pending.is_expired(Instant::now()) {
                debug!(session = %self.name, expected = %pending.expected, "pending continuation expired");
            } else if pending.expected == envelope.event {
                (pending.handler)(&envelope, self);
            } else {
                self.pending = Some(pending);
            }
        }

        self.with_observer(|observer, session| observer.on_envelope(&envelope, session));
        update
    }

    /// Transport reported an error. The session starts closing.
    pub fn on_error(&mut self) {
        warn!(session = %self.name, phase = %self.state.current_phase(), "transport error, closing session");
        self.state.on_error();
        self.transport.close();
    }

    /// Transport reported closed.
    pub fn on_close(&mut self) {
        if self.state.current_phase() == Phase::Closed {
            return;
        }
        self.state.on_close();
        if let Some(pending) = self.pending.take() {
            debug!(session = %self.name, expected = %pending.expected, "discarding continuation on close");
        }
        self.with_observer(|observer, session| observer.on_close(session));
    }

    /// Take the observer out of its slot for the duration of `f`, then put
    /// it back unless `f` installed or cleared one meanwhile.
    fn with_observer(&mut self, f: impl FnOnce(&mut dyn Observer<T>, &mut Self)) {
        let Some(mut observer) = self.observer.take() else {
            return;
        };
        let epoch = self.observer_epoch;
        f(observer.as_mut(), self);
        if self.observer_epoch == epoch {
            self.observer = Some(observer);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
