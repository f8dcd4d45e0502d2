//! Channel-handle lifecycle: close, expiry, and error delivery.

use std::time::Duration;

use campfire_core::SessionError;
use campfire_harness::{FakeRelay, HarnessEnv, test_uri};
use campfire_session::{Campfire, CancellationToken, wait};

const PSK: &str = "abcdefghijklmnopqrstuvwx12345678";

/// Mid-window base: bucket 1699999200, window end 1700001000.
const BASE_SECS: u64 = 1_700_000_000;

async fn started_campfire(relay: &FakeRelay, env: &HarnessEnv) -> Campfire {
    wait(env, &relay.engine(), &test_uri(PSK), None, CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn accept_after_close_returns_closed_immediately() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;

    assert!(campfire.opened());
    campfire.close();

    let err = campfire.accept().await.unwrap_err();
    assert_eq!(err, SessionError::Closed);
    assert!(!campfire.opened());

    // Idempotent: a second close neither panics nor blocks.
    campfire.close();
}

#[tokio::test(start_paused = true)]
async fn close_wakes_a_pending_accept() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = std::sync::Arc::new(started_campfire(&relay, &env).await);

    let closer = std::sync::Arc::clone(&campfire);
    tokio::spawn(async move {
        // Let the accept park before closing.
        tokio::time::sleep(Duration::from_secs(1)).await;
        closer.close();
    });

    let err = campfire.accept().await.unwrap_err();
    assert_eq!(err, SessionError::Closed);
}

#[tokio::test(start_paused = true)]
async fn close_releases_the_engine_session() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;

    assert_eq!(relay.live_sessions(), 1);
    assert_eq!(relay.parked_waiters(), 1);

    campfire.close();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(relay.live_sessions(), 0);
    assert_eq!(relay.parked_waiters(), 0);
}

#[tokio::test(start_paused = true)]
async fn expiry_fires_once_and_unblocks_a_pending_accept() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;

    let accepting = tokio::spawn(async move {
        let err = campfire.accept().await.unwrap_err();
        (campfire, err)
    });

    let (campfire, err) = accepting.await.unwrap();
    assert_eq!(err, SessionError::Expired);

    // The notification is latched: observers arriving late still see it.
    campfire.expired().await;
    assert!(!campfire.opened());

    // "Nobody came" also releases the engine.
    assert_eq!(relay.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn expired_resolves_on_close_too() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;

    campfire.close();
    // Completes promptly rather than waiting out the window.
    campfire.expired().await;
}

#[tokio::test(start_paused = true)]
async fn engine_failure_reaches_errors_and_accept() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;
    let mut errors = campfire.errors();

    relay.inject_failure("relay exploded");

    let err = errors.recv().await.unwrap();
    assert_eq!(err, SessionError::Transport("relay exploded".to_string()));

    // A pending (or later) accept is unblocked with the failure, not left
    // hanging: observing errors() is not required for liveness.
    let err = campfire.accept().await.unwrap_err();
    assert_eq!(err, SessionError::Transport("relay exploded".to_string()));

    assert!(!campfire.opened());
    assert_eq!(relay.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn late_certificate_injection_is_stored() {
    let relay = FakeRelay::new();
    let env = HarnessEnv::at(BASE_SECS);
    let campfire = started_campfire(&relay, &env).await;

    let material =
        campfire_session::CredentialMaterial::from_der(vec![1, 2, 3], vec![4, 5, 6]);
    campfire.set_certificate(material);

    campfire.close();
}
