//! Transport engine abstraction.
//!
//! The engine that actually performs connectivity establishment (ICE-like
//! candidate exchange, encryption handshake, stream multiplexing over UDP)
//! is an external collaborator. This module is the seam: a session is a
//! command handle plus one inbound event queue, so the engine's internal
//! callbacks never run inside campfire code and a fake engine drops in for
//! tests.

use std::fmt;

use async_trait::async_trait;
use campfire_core::{Proposal, SessionError};
use campfire_proto::RelayCandidate;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use crate::certificate::CredentialMaterial;

/// Object-safe byte-stream bound for peer connections.
pub trait PeerStreamIo: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin + fmt::Debug> PeerStreamIo for T {}

/// A bidirectional byte stream to a peer.
pub type PeerStream = Box<dyn PeerStreamIo>;

/// Connection-progress states reported by the engine for one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineConnectionState {
    /// Gathering relay candidates.
    Gathering,
    /// Running connectivity checks.
    Checking,
    /// Connectivity established.
    Connected,
    /// The connection was lost.
    Disconnected,
}

/// Events the engine delivers on a session's queue.
///
/// The queue replaces callback registration: the driver task is the single
/// consumer, and event handling is serialized with all other state
/// transitions for free.
pub enum EngineEvent {
    /// A bidirectional stream to a peer opened.
    ChannelOpened {
        /// Engine-assigned identifier of the originating offer.
        offer_id: String,
        /// The peer stream.
        stream: PeerStream,
    },
    /// Connection progress for one in-flight offer changed.
    StateChanged {
        /// Offer the state belongs to.
        offer_id: String,
        /// The new state.
        state: EngineConnectionState,
    },
    /// The engine discovered a local relay candidate.
    ///
    /// Campfire has no signaling channel to forward these on; they are
    /// observed for diagnostics only.
    CandidateDiscovered {
        /// The candidate in the engine's own string form.
        candidate: String,
    },
    /// The session failed unrecoverably.
    Failed {
        /// Engine-provided reason.
        reason: String,
    },
}

impl fmt::Debug for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelOpened { offer_id, .. } => {
                f.debug_struct("ChannelOpened").field("offer_id", offer_id).finish_non_exhaustive()
            },
            Self::StateChanged { offer_id, state } => f
                .debug_struct("StateChanged")
                .field("offer_id", offer_id)
                .field("state", state)
                .finish(),
            Self::CandidateDiscovered { candidate } => {
                f.debug_struct("CandidateDiscovered").field("candidate", candidate).finish()
            },
            Self::Failed { reason } => f.debug_struct("Failed").field("reason", reason).finish(),
        }
    }
}

/// Everything an engine needs to open a session.
pub struct SessionConfig {
    /// Relay candidates, TURN first, in selection-priority order.
    pub relay_candidates: Vec<RelayCandidate>,
    /// Credential material to present during the encryption handshake.
    pub certificates: Vec<CredentialMaterial>,
}

/// A transport engine capable of opening rendezvous sessions.
#[async_trait]
pub trait TransportEngine: Send + Sync + 'static {
    /// The engine's session handle type.
    type Session: EngineSession;

    /// Open a session, returning the command handle and its event queue.
    async fn open_session(
        &self,
        config: SessionConfig,
    ) -> Result<(Self::Session, mpsc::Receiver<EngineEvent>), SessionError>;
}

/// Command surface of one engine session.
///
/// Implementations must keep already-surfaced peer streams usable when the
/// session handle is dropped; [`EngineSession::release`] is the explicit
/// teardown that severs them.
#[async_trait]
pub trait EngineSession: Send + Sync + 'static {
    /// Register the local proposal. Must be called before
    /// [`EngineSession::set_remote_description`].
    async fn set_local_description(&self, proposal: &Proposal) -> Result<(), SessionError>;

    /// Register the expected-remote proposal.
    async fn set_remote_description(&self, proposal: &Proposal) -> Result<(), SessionError>;

    /// Feed a relay candidate. May be called before or after description
    /// registration; engines must not depend on an ordering between the
    /// two.
    async fn add_relay_candidate(&self, candidate: &RelayCandidate) -> Result<(), SessionError>;

    /// Release all resources held by the session, including relay
    /// allocations. Idempotent.
    async fn release(&self);
}
