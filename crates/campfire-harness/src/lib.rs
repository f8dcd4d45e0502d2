//! Campfire test harness.
//!
//! An in-memory stand-in for the external transport engine plus a
//! virtual-time environment, so waiter/joiner behavior is testable
//! end-to-end with no network and no real clock.
//!
//! [`FakeRelay`] plays the relay: sessions whose proposals derive from the
//! same PSK within the same hour bucket are wired together with in-memory
//! duplex streams, exactly the matching the real engine would perform at a
//! TURN server. Sessions with non-matching derivations never connect,
//! which is the PSK-mismatch behavior the protocol relies on.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod env;
mod fake_engine;

pub use env::HarnessEnv;
pub use fake_engine::{FakeEngine, FakeRelay, FakeSession};

use campfire_proto::CampfireUri;

/// A campfire URI with one TURN candidate pointing at the fake relay.
pub fn test_uri(psk: &str) -> CampfireUri {
    CampfireUri {
        fingerprint: "fingerprint".to_string(),
        turn_servers: vec!["turn:user:pass@fake.relay.test".to_string()],
        psk: psk.to_string(),
        ..CampfireUri::default()
    }
}
