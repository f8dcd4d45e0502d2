//! The campfire channel handle.
//!
//! What a waiter holds while peers arrive: an accept queue, an error
//! source, an expiry notification, and an idempotent close. All operations
//! are safe to use concurrently; the close signal is the single source of
//! truth for "no longer usable" and every operation checks it.

use std::{collections::HashMap, sync::Arc};

use campfire_core::SessionError;
use tokio::sync::{Mutex, broadcast, mpsc, watch};

use crate::{
    certificate::CredentialMaterial,
    engine::{EngineConnectionState, PeerStream},
};

/// Capacity of the accept queue. Additional concurrent joiners beyond the
/// first are an extension point; a small buffer keeps the driver from
/// stalling while the caller is between `accept()` calls.
pub(crate) const ACCEPT_QUEUE_DEPTH: usize = 8;

/// Capacity of the error broadcast. Errors are delivered best-effort: a
/// full or unobserved queue never blocks the driver.
pub(crate) const ERROR_QUEUE_DEPTH: usize = 16;

/// State shared between the handle and the driver task.
///
/// One mutex guards both the certificate list (mutable post-construction
/// for late injection) and the in-flight attempt map, so concurrent engine
/// events cannot interleave partial updates.
#[derive(Default, Debug)]
pub(crate) struct SharedState {
    /// Credential material for this rendezvous session.
    pub certificates: Vec<CredentialMaterial>,
    /// Connection attempts currently in progress, keyed by offer id.
    pub in_flight: HashMap<String, EngineConnectionState>,
    /// First unrecoverable failure, if any; reported by `accept()` after
    /// the stream queue drains.
    pub failure: Option<SessionError>,
}

/// A connection to one or more peers sharing the same pre-shared key.
///
/// Returned by [`crate::wait`]. Dropping the handle without calling
/// [`Campfire::close`] leaves teardown to the driver's close observation,
/// so explicit close is preferred.
#[derive(Debug)]
pub struct Campfire {
    streams: Mutex<mpsc::Receiver<PeerStream>>,
    errors: broadcast::Sender<SessionError>,
    close: watch::Sender<bool>,
    expired: watch::Receiver<bool>,
    shared: Arc<std::sync::Mutex<SharedState>>,
}

impl Campfire {
    pub(crate) fn new(
        streams: mpsc::Receiver<PeerStream>,
        errors: broadcast::Sender<SessionError>,
        close: watch::Sender<bool>,
        expired: watch::Receiver<bool>,
        shared: Arc<std::sync::Mutex<SharedState>>,
    ) -> Self {
        Self { streams: Mutex::new(streams), errors, close, expired, shared }
    }

    /// Wait for the next peer stream.
    ///
    /// Blocks until a peer connects, then yields its bidirectional byte
    /// stream. Never hangs past a failure: when the session closes,
    /// expires, or fails, a pending call returns the corresponding error
    /// immediately.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Closed`] after [`Campfire::close`]
    /// - [`SessionError::Expired`] once the rendezvous window has elapsed
    /// - the recorded [`SessionError::Transport`] after an engine failure
    pub async fn accept(&self) -> Result<PeerStream, SessionError> {
        let mut close = self.close.subscribe();
        if *close.borrow() {
            return Err(SessionError::Closed);
        }
        let mut streams = self.streams.lock().await;
        tokio::select! {
            biased;
            maybe = streams.recv() => maybe.ok_or_else(|| self.terminal_error()),
            _ = close.changed() => Err(SessionError::Closed),
        }
    }

    /// Close the campfire. Idempotent; releases the engine session via the
    /// driver and wakes any pending [`Campfire::accept`] or
    /// [`Campfire::expired`] waiters.
    pub fn close(&self) {
        self.close.send_replace(true);
    }

    /// Subscribe to asynchronous session errors.
    ///
    /// Transport failures after construction are delivered here rather
    /// than thrown. Delivery is buffered best-effort: subscribe before
    /// errors of interest can occur, or rely on [`Campfire::accept`]'s
    /// terminal error instead.
    pub fn errors(&self) -> broadcast::Receiver<SessionError> {
        self.errors.subscribe()
    }

    /// Resolves when the rendezvous window expires or the campfire closes,
    /// whichever is first. Completes at most once per handle lifetime;
    /// "nobody came" is thereby distinguishable from "something broke",
    /// which arrives on [`Campfire::errors`] instead.
    pub async fn expired(&self) {
        let mut expired = self.expired.clone();
        let mut close = self.close.subscribe();
        let expiry = async move {
            if expired.wait_for(|e| *e).await.is_err() {
                // Driver gone without expiring (it failed); only close
                // ends this wait now - failures travel on errors().
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            () = expiry => {},
            res = close.wait_for(|c| *c) => drop(res),
        }
    }

    /// Non-blocking liveness probe: true while the campfire can still
    /// accept peers.
    pub fn opened(&self) -> bool {
        if *self.close.borrow() || *self.expired.borrow() {
            return false;
        }
        self.lock_shared().failure.is_none()
    }

    /// Replace the session's credential material.
    ///
    /// The list is mutable post-construction to allow late certificate
    /// injection; it applies to engine attempts created after the call.
    pub fn set_certificate(&self, material: CredentialMaterial) {
        self.lock_shared().certificates = vec![material];
    }

    /// Number of connection attempts currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock_shared().in_flight.len()
    }

    fn terminal_error(&self) -> SessionError {
        if *self.expired.borrow() {
            return SessionError::Expired;
        }
        if let Some(failure) = self.lock_shared().failure.clone() {
            return failure;
        }
        SessionError::Closed
    }

    fn lock_shared(&self) -> std::sync::MutexGuard<'_, SharedState> {
        match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
