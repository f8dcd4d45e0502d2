//! The Waiter role: listen at a campfire for joining peers.

use std::{sync::Arc, time::Duration};

use campfire_core::{
    Environment, PLACEHOLDER_FINGERPRINT, Proposal, ProposalRole, SessionError,
    rendezvous::{RendezvousAction, RendezvousInput, RendezvousMachine},
};
use campfire_crypto::HourBucket;
use campfire_proto::{CampfireUri, RelayCandidate};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    certificate::CredentialMaterial,
    channel::{ACCEPT_QUEUE_DEPTH, Campfire, ERROR_QUEUE_DEPTH, SharedState},
    engine::{EngineConnectionState, EngineEvent, EngineSession, PeerStream, SessionConfig, TransportEngine},
    relays::resolve_relays,
};

/// Wait for peers to join at the given campfire.
///
/// Resolves relay candidates, derives the local (answer) and
/// expected-remote (offer) proposals for the current hour bucket, registers
/// them with the transport engine — local strictly before remote — and
/// returns a [`Campfire`] handle. A driver task then funnels the engine's
/// event queue through the rendezvous state machine until the session
/// closes, expires, or fails.
///
/// The proposal fingerprint comes from `credentials` when present; without
/// credential material the protocol's historical placeholder is used.
///
/// # Errors
///
/// - [`SessionError::NoRelay`] when no usable relay candidate resolves
/// - [`SessionError::Cancelled`] when `cancel` fires during setup (engine
///   resources are released first)
/// - engine errors from session creation or description registration
pub async fn wait<E, T>(
    env: &E,
    engine: &T,
    uri: &CampfireUri,
    credentials: Option<CredentialMaterial>,
    cancel: CancellationToken,
) -> Result<Campfire, SessionError>
where
    E: Environment,
    T: TransportEngine,
{
    let bucket = HourBucket::from_unix_secs(env.wall_clock_secs());
    let mut machine = RendezvousMachine::new(bucket);

    machine.handle(RendezvousInput::Start)?;
    let candidates = resolve_relays(uri);
    let register = machine.handle(RendezvousInput::RelaysResolved { count: candidates.len() })?;

    let fingerprint = credentials
        .as_ref()
        .map_or_else(|| PLACEHOLDER_FINGERPRINT.to_string(), |c| c.fingerprint().to_string());
    let psk = uri.psk.as_bytes();
    let local = Proposal::build(psk, bucket, ProposalRole::Answer, &fingerprint);
    let remote = Proposal::build(psk, bucket, ProposalRole::Offer, &fingerprint);
    tracing::debug!(
        session_id = %local.session_id,
        relays = candidates.len(),
        expires_at = machine.expires_at_secs(),
        "waiting at campfire",
    );

    let config = SessionConfig {
        relay_candidates: candidates.clone(),
        certificates: credentials.iter().cloned().collect(),
    };
    let (session, events) = cancellable(&cancel, engine.open_session(config)).await??;

    if let Err(err) = register_with_engine(&cancel, &session, &register, &local, &remote, &candidates).await
    {
        session.release().await;
        return Err(err);
    }

    let (streams_tx, streams_rx) = mpsc::channel(ACCEPT_QUEUE_DEPTH);
    let (errors_tx, _) = broadcast::channel(ERROR_QUEUE_DEPTH);
    let (close_tx, close_rx) = watch::channel(false);
    let (expired_tx, expired_rx) = watch::channel(false);
    let shared = Arc::new(std::sync::Mutex::new(SharedState {
        certificates: credentials.into_iter().collect(),
        ..SharedState::default()
    }));

    let driver = Driver {
        env: env.clone(),
        session,
        machine,
        events,
        streams_tx,
        errors_tx: errors_tx.clone(),
        expired_tx,
        close_rx,
        cancel,
        shared: Arc::clone(&shared),
        pending_stream: None,
    };
    tokio::spawn(driver.run());

    Ok(Campfire::new(streams_rx, errors_tx, close_tx, expired_rx, shared))
}

/// Execute the machine's registration actions against the engine session,
/// preserving the local-before-remote ordering the actions encode.
pub(crate) async fn register_with_engine<S: EngineSession>(
    cancel: &CancellationToken,
    session: &S,
    actions: &[RendezvousAction],
    local: &Proposal,
    remote: &Proposal,
    candidates: &[RelayCandidate],
) -> Result<(), SessionError> {
    for action in actions {
        match action {
            RendezvousAction::RegisterLocal => {
                cancellable(cancel, session.set_local_description(local)).await??;
            },
            RendezvousAction::RegisterRemote => {
                cancellable(cancel, session.set_remote_description(remote)).await??;
            },
            RendezvousAction::BeginGathering => {
                for candidate in candidates {
                    cancellable(cancel, session.add_relay_candidate(candidate)).await??;
                }
            },
            other => {
                tracing::debug!(?other, "setup action with no engine effect");
            },
        }
    }
    Ok(())
}

/// Race a future against cancellation.
pub(crate) async fn cancellable<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, SessionError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled),
        out = fut => Ok(out),
    }
}

/// The waiter's driver task: single consumer of the engine event queue,
/// single writer of machine state.
struct Driver<E: Environment, S: EngineSession> {
    env: E,
    session: S,
    machine: RendezvousMachine,
    events: mpsc::Receiver<EngineEvent>,
    streams_tx: mpsc::Sender<PeerStream>,
    errors_tx: broadcast::Sender<SessionError>,
    expired_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    shared: Arc<std::sync::Mutex<SharedState>>,
    /// Stream carried between a `ChannelOpened` event and its
    /// `DeliverStream` action. Events are handled one at a time, so a
    /// single slot suffices.
    pending_stream: Option<PeerStream>,
}

impl<E: Environment, S: EngineSession> Driver<E, S> {
    async fn run(mut self) {
        loop {
            let remaining = Duration::from_secs(
                self.machine.expires_at_secs().saturating_sub(self.env.wall_clock_secs()),
            );

            let input = tokio::select! {
                biased;
                _ = async { let _ = self.close_rx.wait_for(|closed| *closed).await; } => {
                    RendezvousInput::CloseRequested
                },
                _ = self.cancel.cancelled() => RendezvousInput::CloseRequested,
                maybe = self.events.recv() => match maybe {
                    Some(event) => match self.input_from_event(event) {
                        Some(input) => input,
                        None => continue,
                    },
                    None => RendezvousInput::EngineFailed {
                        reason: "engine event stream closed".to_string(),
                    },
                },
                _ = self.env.sleep(remaining) => {
                    RendezvousInput::Tick { wall_clock_secs: self.env.wall_clock_secs() }
                },
            };

            let actions = match self.machine.handle(input) {
                Ok(actions) => actions,
                Err(err) => {
                    tracing::warn!(%err, "rendezvous input rejected");
                    continue;
                },
            };
            for action in actions {
                self.execute(action).await;
            }

            if self.machine.state().is_terminal() {
                tracing::debug!(state = ?self.machine.state(), "rendezvous driver finished");
                break;
            }
        }
    }

    fn input_from_event(&mut self, event: EngineEvent) -> Option<RendezvousInput> {
        match event {
            EngineEvent::ChannelOpened { offer_id, stream } => {
                self.pending_stream = Some(stream);
                Some(RendezvousInput::StreamOpened { offer_id })
            },
            EngineEvent::StateChanged { offer_id, state } => {
                let mut shared = lock_shared(&self.shared);
                match state {
                    EngineConnectionState::Gathering | EngineConnectionState::Checking => {
                        shared.in_flight.insert(offer_id, state);
                    },
                    EngineConnectionState::Connected | EngineConnectionState::Disconnected => {
                        shared.in_flight.remove(&offer_id);
                    },
                }
                None
            },
            EngineEvent::CandidateDiscovered { candidate } => {
                // No signaling channel exists to forward these on.
                tracing::debug!(%candidate, "local relay candidate discovered");
                None
            },
            EngineEvent::Failed { reason } => Some(RendezvousInput::EngineFailed { reason }),
        }
    }

    async fn execute(&mut self, action: RendezvousAction) {
        match action {
            RendezvousAction::DeliverStream { offer_id } => {
                let Some(stream) = self.pending_stream.take() else {
                    tracing::warn!(%offer_id, "stream action without a pending stream");
                    return;
                };
                lock_shared(&self.shared).in_flight.remove(&offer_id);
                tokio::select! {
                    res = self.streams_tx.send(stream) => {
                        if res.is_err() {
                            tracing::debug!("accept handle dropped; discarding peer stream");
                        }
                    },
                    res = self.close_rx.wait_for(|closed| *closed) => {
                        drop(res);
                        tracing::debug!("closed while delivering; discarding peer stream");
                    },
                }
            },
            RendezvousAction::DeliverError { error } => {
                {
                    let mut shared = lock_shared(&self.shared);
                    if shared.failure.is_none() {
                        shared.failure = Some(error.clone());
                    }
                }
                // Best-effort: an unobserved error source never blocks us.
                let _ = self.errors_tx.send(error);
            },
            RendezvousAction::SignalExpired => {
                self.expired_tx.send_replace(true);
            },
            RendezvousAction::ReleaseEngine => {
                self.session.release().await;
            },
            RendezvousAction::ResolveRelays
            | RendezvousAction::RegisterLocal
            | RendezvousAction::RegisterRemote
            | RendezvousAction::BeginGathering => {
                // Setup-phase actions; the machine never emits them once
                // the driver owns it.
                tracing::warn!("unexpected setup action in driver loop");
            },
        }
    }
}

pub(crate) fn lock_shared(
    shared: &std::sync::Mutex<SharedState>,
) -> std::sync::MutexGuard<'_, SharedState> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
