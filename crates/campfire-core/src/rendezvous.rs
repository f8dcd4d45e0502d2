//! Rendezvous state machine.
//!
//! Pure, action-based: inputs go in, actions for the driver come out, and
//! no I/O happens here. Time arrives as an input (`Tick`), so the machine is
//! fully deterministic under test.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ Start ┌─────────────────┐ RelaysResolved ┌──────────────┐
//! │ Idle │──────>│ ResolvingRelays │───────────────>│ AwaitingPeer │
//! └──────┘       └─────────────────┘                └──────────────┘
//!                                                      │        │
//!                                         StreamOpened │        │ Tick past window
//!                                                      ↓        ↓
//!                                              ┌───────────┐ ┌─────────┐
//!                                              │ Connected │>│ Expired │
//!                                              └───────────┘ └─────────┘
//!
//! CloseRequested: any non-terminal ──> Closed
//! EngineFailed:   any non-terminal ──> Failed
//! ```
//!
//! `Expired` is reachable from both `AwaitingPeer` (nobody came; the engine
//! is released) and `Connected` (the window closed behind an established
//! connection; accepted streams stay usable, only further joiners are cut
//! off).

use campfire_crypto::HourBucket;

use crate::error::SessionError;

/// Rendezvous lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousState {
    /// Nothing started yet.
    Idle,
    /// Relay candidates are being resolved from the URI.
    ResolvingRelays,
    /// Descriptions registered, gathering; waiting for a peer to arrive.
    AwaitingPeer,
    /// At least one peer stream has opened.
    Connected,
    /// Explicitly closed by the caller.
    Closed,
    /// The rendezvous window elapsed.
    Expired,
    /// An unrecoverable engine error occurred.
    Failed,
}

impl RendezvousState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Expired | Self::Failed)
    }
}

/// Inputs fed into the machine by the driver.
#[derive(Debug, Clone)]
pub enum RendezvousInput {
    /// Begin the attempt.
    Start,
    /// Relay resolution finished with this many usable candidates.
    RelaysResolved {
        /// Usable candidate count; zero fails the attempt.
        count: usize,
    },
    /// The engine opened a bidirectional stream for this offer.
    StreamOpened {
        /// Engine-assigned identifier of the originating offer.
        offer_id: String,
    },
    /// The engine reported an unrecoverable failure.
    EngineFailed {
        /// Engine-provided reason.
        reason: String,
    },
    /// Periodic time input for expiry detection.
    Tick {
        /// Current wall-clock unix seconds.
        wall_clock_secs: u64,
    },
    /// The caller asked to close.
    CloseRequested,
}

/// Actions the driver executes on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendezvousAction {
    /// Resolve relay candidates from the URI and feed back
    /// [`RendezvousInput::RelaysResolved`].
    ResolveRelays,
    /// Register the local proposal with the engine. Always ordered strictly
    /// before [`RendezvousAction::RegisterRemote`] — the engine requires it.
    RegisterLocal,
    /// Register the expected-remote proposal with the engine.
    RegisterRemote,
    /// Start relay-candidate gathering. May race with registration; must
    /// not be assumed to happen after it.
    BeginGathering,
    /// Surface this stream through the accept channel.
    DeliverStream {
        /// Offer the stream belongs to.
        offer_id: String,
    },
    /// Put this error on the error notification source.
    DeliverError {
        /// The error to deliver.
        error: SessionError,
    },
    /// Fire the expiry notification (exactly once) and unblock waiters.
    SignalExpired,
    /// Release the engine session's resources.
    ReleaseEngine,
}

/// The rendezvous state machine for one attempt.
///
/// One instance per campfire, owned by the driver task. The expiry instant
/// is fixed at construction from the hour bucket the proposals were derived
/// in: when the bucket's window ends, the derived identifiers stop matching
/// and waiting longer cannot succeed.
#[derive(Debug, Clone)]
pub struct RendezvousMachine {
    state: RendezvousState,
    expires_at_secs: u64,
    expiry_signalled: bool,
}

impl RendezvousMachine {
    /// Create a machine expiring at the end of `bucket`'s validity window.
    pub fn new(bucket: HourBucket) -> Self {
        Self {
            state: RendezvousState::Idle,
            expires_at_secs: bucket.expires_at_secs(),
            expiry_signalled: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> RendezvousState {
        self.state
    }

    /// Unix seconds at which the rendezvous window ends.
    pub fn expires_at_secs(&self) -> u64 {
        self.expires_at_secs
    }

    /// Feed one input, returning the actions to execute.
    ///
    /// Late engine events arriving after a terminal state produce no
    /// actions rather than errors — the close channel is the source of
    /// truth and stale callbacks are expected.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidTransition`] for caller inputs (`Start`)
    ///   out of order
    /// - [`SessionError::NoRelay`] when resolution yields zero candidates
    pub fn handle(
        &mut self,
        input: RendezvousInput,
    ) -> Result<Vec<RendezvousAction>, SessionError> {
        match input {
            RendezvousInput::Start => self.handle_start(),
            RendezvousInput::RelaysResolved { count } => self.handle_relays_resolved(count),
            RendezvousInput::StreamOpened { offer_id } => Ok(self.handle_stream_opened(offer_id)),
            RendezvousInput::EngineFailed { reason } => Ok(self.handle_engine_failed(reason)),
            RendezvousInput::Tick { wall_clock_secs } => Ok(self.handle_tick(wall_clock_secs)),
            RendezvousInput::CloseRequested => Ok(self.handle_close()),
        }
    }

    fn handle_start(&mut self) -> Result<Vec<RendezvousAction>, SessionError> {
        if self.state != RendezvousState::Idle {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                operation: "start",
            });
        }
        self.state = RendezvousState::ResolvingRelays;
        Ok(vec![RendezvousAction::ResolveRelays])
    }

    fn handle_relays_resolved(
        &mut self,
        count: usize,
    ) -> Result<Vec<RendezvousAction>, SessionError> {
        if self.state != RendezvousState::ResolvingRelays {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                operation: "resolve relays",
            });
        }
        if count == 0 {
            self.state = RendezvousState::Failed;
            return Err(SessionError::NoRelay);
        }
        self.state = RendezvousState::AwaitingPeer;
        Ok(vec![
            RendezvousAction::RegisterLocal,
            RendezvousAction::RegisterRemote,
            RendezvousAction::BeginGathering,
        ])
    }

    fn handle_stream_opened(&mut self, offer_id: String) -> Vec<RendezvousAction> {
        match self.state {
            RendezvousState::AwaitingPeer => {
                self.state = RendezvousState::Connected;
                vec![RendezvousAction::DeliverStream { offer_id }]
            },
            // Additional concurrent joiners beyond the first; still
            // delivered, the accept channel buffers them.
            RendezvousState::Connected => vec![RendezvousAction::DeliverStream { offer_id }],
            // Stale callback after close/expiry/failure.
            _ => vec![],
        }
    }

    fn handle_engine_failed(&mut self, reason: String) -> Vec<RendezvousAction> {
        if self.state.is_terminal() {
            return vec![];
        }
        self.state = RendezvousState::Failed;
        vec![
            RendezvousAction::DeliverError { error: SessionError::Transport(reason) },
            RendezvousAction::ReleaseEngine,
        ]
    }

    fn handle_tick(&mut self, wall_clock_secs: u64) -> Vec<RendezvousAction> {
        if wall_clock_secs < self.expires_at_secs || self.expiry_signalled {
            return vec![];
        }
        match self.state {
            RendezvousState::AwaitingPeer => {
                self.state = RendezvousState::Expired;
                self.expiry_signalled = true;
                vec![RendezvousAction::SignalExpired, RendezvousAction::ReleaseEngine]
            },
            // The window closed behind an established connection: stop
            // further joiners but leave the engine (and its streams) alive.
            RendezvousState::Connected => {
                self.state = RendezvousState::Expired;
                self.expiry_signalled = true;
                vec![RendezvousAction::SignalExpired]
            },
            _ => vec![],
        }
    }

    fn handle_close(&mut self) -> Vec<RendezvousAction> {
        if self.state.is_terminal() {
            // Idempotent; a second close does nothing.
            return vec![];
        }
        self.state = RendezvousState::Closed;
        vec![RendezvousAction::ReleaseEngine]
    }
}
