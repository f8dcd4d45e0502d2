//! The Joiner role: connect to a peer waiting at a campfire.

use std::time::Duration;

use campfire_core::{
    Environment, PLACEHOLDER_FINGERPRINT, Proposal, ProposalRole, SessionError,
    rendezvous::{RendezvousAction, RendezvousInput, RendezvousMachine},
};
use campfire_crypto::HourBucket;
use campfire_proto::CampfireUri;
use tokio_util::sync::CancellationToken;

use crate::{
    certificate::CredentialMaterial,
    engine::{EngineEvent, EngineSession, PeerStream, SessionConfig, TransportEngine},
    relays::resolve_relays,
    waiter::{cancellable, register_with_engine},
};

/// Join the peer waiting at the given campfire.
///
/// The mirror image of [`crate::wait`]: same relay resolution, same hour
/// bucket, opposite proposal roles (offer locally, answer expected from the
/// remote side). Resolves to the first opened peer stream.
///
/// Cancellation is honored at every suspension point; the engine session is
/// released before [`SessionError::Cancelled`] is returned. A single
/// attempt is made — retry policy belongs to the caller.
///
/// # Errors
///
/// - [`SessionError::NoRelay`] when no usable relay candidate resolves
/// - [`SessionError::Expired`] when the rendezvous window elapses first
/// - [`SessionError::Transport`] when the engine fails
/// - [`SessionError::Cancelled`] when `cancel` fires
pub async fn join<E, T>(
    env: &E,
    engine: &T,
    uri: &CampfireUri,
    credentials: Option<CredentialMaterial>,
    cancel: CancellationToken,
) -> Result<PeerStream, SessionError>
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
    let local = Proposal::build(psk, bucket, ProposalRole::Offer, &fingerprint);
    let remote = Proposal::build(psk, bucket, ProposalRole::Answer, &fingerprint);
    tracing::debug!(
        session_id = %local.session_id,
        relays = candidates.len(),
        "joining campfire",
    );

    let config = SessionConfig {
        relay_candidates: candidates.clone(),
        certificates: credentials.into_iter().collect(),
    };
    let (session, mut events) = cancellable(&cancel, engine.open_session(config)).await??;

    if let Err(err) =
        register_with_engine(&cancel, &session, &register, &local, &remote, &candidates).await
    {
        session.release().await;
        return Err(err);
    }

    loop {
        let remaining = Duration::from_secs(
            machine.expires_at_secs().saturating_sub(env.wall_clock_secs()),
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.release().await;
                return Err(SessionError::Cancelled);
            },
            maybe = events.recv() => match maybe {
                Some(EngineEvent::ChannelOpened { offer_id, stream }) => {
                    let actions = machine.handle(RendezvousInput::StreamOpened { offer_id })?;
                    if actions.iter().any(|a| matches!(a, RendezvousAction::DeliverStream { .. })) {
                        // The session handle is dropped, not released:
                        // engines keep surfaced streams alive past it.
                        return Ok(stream);
                    }
                },
                Some(EngineEvent::Failed { reason }) => {
                    let actions = machine.handle(RendezvousInput::EngineFailed { reason })?;
                    session.release().await;
                    for action in actions {
                        if let RendezvousAction::DeliverError { error } = action {
                            return Err(error);
                        }
                    }
                    return Err(SessionError::Transport("engine failed".to_string()));
                },
                Some(EngineEvent::StateChanged { offer_id, state }) => {
                    tracing::debug!(%offer_id, ?state, "connection progress");
                },
                Some(EngineEvent::CandidateDiscovered { candidate }) => {
                    tracing::debug!(%candidate, "local relay candidate discovered");
                },
                None => {
                    session.release().await;
                    return Err(SessionError::Transport(
                        "engine event stream closed".to_string(),
                    ));
                },
            },
            _ = env.sleep(remaining) => {
                let wall_clock_secs = env.wall_clock_secs();
                let actions = machine.handle(RendezvousInput::Tick { wall_clock_secs })?;
                if actions.iter().any(|a| matches!(a, RendezvousAction::SignalExpired)) {
                    session.release().await;
                    return Err(SessionError::Expired);
                }
            },
        }
    }
}
