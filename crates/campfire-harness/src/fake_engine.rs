//! In-memory fake transport engine.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use campfire_core::{Proposal, ProposalRole, SessionError};
use campfire_proto::RelayCandidate;
use campfire_session::engine::{
    EngineConnectionState, EngineEvent, EngineSession, SessionConfig, TransportEngine,
};
use tokio::sync::mpsc;

const EVENT_QUEUE_DEPTH: usize = 32;
const STREAM_BUFFER: usize = 64 * 1024;

/// The shared in-memory "relay" that fake engine sessions meet at.
///
/// A waiter session parks once both of its descriptions are registered; a
/// joiner session connects to a parked waiter when their derived session
/// identifiers match and each side's expected remote ufrag equals the
/// other's local ufrag. Matched sides each receive a `StateChanged` and a
/// `ChannelOpened` carrying one half of an in-memory duplex stream.
pub struct FakeRelay {
    inner: Arc<Mutex<RelayInner>>,
}

#[derive(Default)]
struct RelayInner {
    next_session: u64,
    next_offer: u64,
    /// Live sessions, keyed by engine-internal uid.
    sessions: HashMap<u64, mpsc::Sender<EngineEvent>>,
    /// Parked waiters, keyed by derived session identifier.
    waiting: HashMap<String, Vec<ParkedWaiter>>,
}

struct ParkedWaiter {
    uid: u64,
    local_ufrag: String,
    remote_ufrag: String,
    events: mpsc::Sender<EngineEvent>,
}

impl FakeRelay {
    /// Create an empty relay.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(RelayInner::default())) }
    }

    /// An engine handle backed by this relay. Every handle shares the
    /// relay's session table, so independently-created engines can meet.
    pub fn engine(&self) -> FakeEngine {
        FakeEngine { inner: Arc::clone(&self.inner) }
    }

    /// Deliver an unrecoverable failure to every live session.
    pub fn inject_failure(&self, reason: &str) {
        let senders: Vec<_> = lock(&self.inner).sessions.values().cloned().collect();
        for sender in senders {
            let _ = sender
                .try_send(EngineEvent::Failed { reason: reason.to_string() });
        }
    }

    /// Number of sessions that have not been released.
    pub fn live_sessions(&self) -> usize {
        lock(&self.inner).sessions.len()
    }

    /// Number of waiters currently parked.
    pub fn parked_waiters(&self) -> usize {
        lock(&self.inner).waiting.values().map(Vec::len).sum()
    }
}

impl Default for FakeRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine handle produced by [`FakeRelay::engine`].
pub struct FakeEngine {
    inner: Arc<Mutex<RelayInner>>,
}

#[async_trait]
impl TransportEngine for FakeEngine {
    type Session = FakeSession;

    async fn open_session(
        &self,
        config: SessionConfig,
    ) -> Result<(Self::Session, mpsc::Receiver<EngineEvent>), SessionError> {
        if config.relay_candidates.is_empty() {
            return Err(SessionError::Transport("no relay candidates supplied".to_string()));
        }

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let uid = {
            let mut inner = lock(&self.inner);
            inner.next_session += 1;
            let uid = inner.next_session;
            inner.sessions.insert(uid, events_tx.clone());
            uid
        };

        let session = FakeSession {
            uid,
            relay: Arc::clone(&self.inner),
            events: events_tx,
            descriptions: Mutex::new(Descriptions::default()),
            released: AtomicBool::new(false),
        };
        Ok((session, events_rx))
    }
}

#[derive(Default)]
struct Descriptions {
    local: Option<Proposal>,
    remote: Option<Proposal>,
}

/// One fake engine session.
///
/// Enforces the engine contract the real collaborator has: the local
/// description must be registered before the remote one. Surfaced duplex
/// streams outlive both drop and release, matching the trait's stream
/// liveness requirement.
pub struct FakeSession {
    uid: u64,
    relay: Arc<Mutex<RelayInner>>,
    events: mpsc::Sender<EngineEvent>,
    descriptions: Mutex<Descriptions>,
    released: AtomicBool,
}

impl FakeSession {
    fn check_live(&self) -> Result<(), SessionError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(SessionError::Transport("session released".to_string()));
        }
        Ok(())
    }

    /// Park or match once both descriptions are known.
    fn try_match(&self) {
        let (local, remote) = {
            let descriptions = lock(&self.descriptions);
            match (&descriptions.local, &descriptions.remote) {
                (Some(local), Some(remote)) => (local.clone(), remote.clone()),
                _ => return,
            }
        };

        let session_id = local.session_id.clone();
        let mut inner = lock(&self.relay);
        match local.role {
            ProposalRole::Answer => {
                inner.waiting.entry(session_id).or_default().push(ParkedWaiter {
                    uid: self.uid,
                    local_ufrag: local.ufrag,
                    remote_ufrag: remote.ufrag,
                    events: self.events.clone(),
                });
            },
            ProposalRole::Offer => {
                let waiter_events = inner.waiting.get(&session_id).and_then(|waiters| {
                    waiters
                        .iter()
                        .find(|w| w.local_ufrag == remote.ufrag && w.remote_ufrag == local.ufrag)
                        .map(|w| w.events.clone())
                });
                let Some(waiter_events) = waiter_events else {
                    // Nobody waiting with matching derivations: the PSK or
                    // the hour bucket disagrees, and no connection forms.
                    return;
                };
                inner.next_offer += 1;
                let offer_id = format!("offer-{}", inner.next_offer);
                drop(inner);

                let (waiter_half, joiner_half) = tokio::io::duplex(STREAM_BUFFER);
                deliver(&waiter_events, &offer_id, waiter_half);
                deliver(&self.events, &offer_id, joiner_half);
            },
        }
    }
}

fn deliver(events: &mpsc::Sender<EngineEvent>, offer_id: &str, half: tokio::io::DuplexStream) {
    let _ = events.try_send(EngineEvent::StateChanged {
        offer_id: offer_id.to_string(),
        state: EngineConnectionState::Checking,
    });
    let _ = events.try_send(EngineEvent::ChannelOpened {
        offer_id: offer_id.to_string(),
        stream: Box::new(half),
    });
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn set_local_description(&self, proposal: &Proposal) -> Result<(), SessionError> {
        self.check_live()?;
        let mut descriptions = lock(&self.descriptions);
        if descriptions.remote.is_some() {
            return Err(SessionError::Transport(
                "local description must be registered before remote".to_string(),
            ));
        }
        descriptions.local = Some(proposal.clone());
        Ok(())
    }

    async fn set_remote_description(&self, proposal: &Proposal) -> Result<(), SessionError> {
        self.check_live()?;
        {
            let mut descriptions = lock(&self.descriptions);
            if descriptions.local.is_none() {
                return Err(SessionError::Transport(
                    "remote description registered before local".to_string(),
                ));
            }
            descriptions.remote = Some(proposal.clone());
        }
        self.try_match();
        Ok(())
    }

    async fn add_relay_candidate(&self, candidate: &RelayCandidate) -> Result<(), SessionError> {
        self.check_live()?;
        // Echo as a discovered local candidate; there is nothing to relay
        // it to in-memory.
        let _ = self
            .events
            .try_send(EngineEvent::CandidateDiscovered { candidate: candidate.url() });
        Ok(())
    }

    async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut inner = lock(&self.relay);
        inner.sessions.remove(&self.uid);
        for waiters in inner.waiting.values_mut() {
            waiters.retain(|w| w.uid != self.uid);
        }
        inner.waiting.retain(|_, waiters| !waiters.is_empty());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
