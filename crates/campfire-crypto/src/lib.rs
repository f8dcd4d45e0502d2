//! Campfire Cryptographic Primitives
//!
//! Cryptographic building blocks for the Campfire rendezvous protocol. Pure
//! functions with deterministic outputs. Callers provide random bytes and
//! wall-clock time for deterministic testing.
//!
//! # Temporal Keys
//!
//! Two peers that share a PSK never exchange session parameters. Instead each
//! derives them independently from the PSK and the current UTC hour:
//!
//! ```text
//! PSK (shared out-of-band)
//!        │
//!        ▼
//! HMAC-SHA256(key = PSK, msg = hour_bucket || tag) → temporal key (hex)
//!        │
//!        ├── tag "session"  → shared session identifier (both roles)
//!        ├── tag "offer"    → joiner's username fragment / password
//!        └── tag "answer"   → waiter's username fragment / password
//! ```
//!
//! Two computations made by different processes within the same UTC hour,
//! with the same PSK and tag, are byte-identical. That identity is the whole
//! rendezvous mechanism.
//!
//! # Security
//!
//! Temporal keys provide rendezvous coordination, not confidentiality or
//! authentication. Anyone who knows the PSK can compute the same values; the
//! PSK is the only secret. PSK memory is zeroized on drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod psk;
mod temporal;

pub use psk::{PSK_ALPHABET, PSK_SIZE, Psk};
pub use temporal::{HourBucket, derive_temporal_key, fold_numeric};
