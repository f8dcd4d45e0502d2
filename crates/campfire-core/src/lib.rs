//! Campfire Protocol Core
//!
//! Sans-IO heart of the rendezvous scheme: the environment abstraction, the
//! proposal builder, and the action-based rendezvous state machine. No
//! sockets, no clocks, no tasks — callers (the `campfire-session` drivers)
//! feed inputs in and execute the returned actions.
//!
//! # Rendezvous in one paragraph
//!
//! Both peers hold the same PSK. Each derives, from the PSK and the current
//! UTC hour, the session identifier and per-role credentials the *other*
//! side will derive too, builds a local proposal for its own role and an
//! expected-remote proposal for the opposite role, and hands both to the
//! transport engine. Nothing is exchanged: the engine on each side believes
//! it has already completed a description exchange, and connectivity
//! establishment proceeds at the shared relay.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod proposal;
pub mod rendezvous;

pub use campfire_crypto::{PSK_SIZE, Psk};
pub use env::{Environment, generate_psk};
pub use error::SessionError;
pub use proposal::{PLACEHOLDER_FINGERPRINT, Proposal, ProposalRole, SESSION_TAG};
pub use rendezvous::{RendezvousAction, RendezvousInput, RendezvousMachine, RendezvousState};
