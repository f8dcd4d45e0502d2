//! Campfire Session Layer
//!
//! Drives the Sans-IO rendezvous machine from [`campfire_core`] against a
//! transport engine on tokio. Two entry points:
//!
//! - [`wait`]: listen at a campfire; returns a [`Campfire`] handle whose
//!   `accept()` yields peer streams as they arrive.
//! - [`join`]: connect to a waiting campfire; resolves to a single peer
//!   stream.
//!
//! # Architecture
//!
//! The transport engine is consumed through the [`engine::TransportEngine`]
//! trait: one command handle plus one inbound event queue per session,
//! rather than callback registration. The driver task is the queue's only
//! consumer and the only writer of machine state, which keeps locking down
//! to the single mutex guarding the certificate list and the in-flight
//! attempt map.
//!
//! Asynchronous engine failures are never thrown into caller code. They go
//! to the handle's error source, and the driver unblocks any pending
//! `accept()` itself — observing `errors()` is advisable but not required
//! for liveness.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod certificate;
mod channel;
pub mod engine;
mod joiner;
mod relays;
mod system_env;
mod waiter;

pub use certificate::{CredentialError, CredentialMaterial};
pub use channel::Campfire;
pub use joiner::join;
pub use system_env::SystemEnv;
pub use tokio_util::sync::CancellationToken;
pub use waiter::wait;
