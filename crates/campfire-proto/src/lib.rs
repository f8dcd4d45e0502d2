//! Campfire interchange formats.
//!
//! The wire-adjacent value types of the rendezvous scheme: the `camp://` URI
//! that bundles a PSK with relay candidates, and the parsed relay candidate
//! tuples handed to the transport engine.
//!
//! # URI format
//!
//! ```text
//! camp://<fingerprint>[/<path>]?[<N>=<candidate>]...[&<extra-args>]#<PSK>
//! ```
//!
//! `<N>` are consecutive integers starting at 0, one per relay candidate,
//! categorized by scheme prefix (`turn:`, `stun:`, `ws:`/`wss:`,
//! `http:`/`https:`). Non-numeric query keys are opaque pass-through
//! arguments. The fragment is the PSK.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod candidate;
mod uri;

pub use candidate::{CandidateKind, NO_CREDENTIAL, RelayCandidate};
pub use uri::{CampfireUri, DEFAULT_STUN_SERVER, UriError, default_turn_candidate};
