//! Error types for the rendezvous session layer.
//!
//! Construction-time failures (URI parsing, candidate parsing, relay
//! resolution) are returned synchronously. Post-construction transport
//! failures are never thrown into caller code — they travel on the session's
//! error notification source.

use campfire_proto::UriError;
use thiserror::Error;

use crate::rendezvous::RendezvousState;

/// Errors surfaced by a rendezvous session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The URI or one of its candidates could not be parsed. Fix the input
    /// before retrying.
    #[error(transparent)]
    Uri(#[from] UriError),

    /// Zero usable relay candidates resolved. Fatal to the attempt.
    #[error("no usable relay candidates")]
    NoRelay,

    /// The transport engine reported a failure or disconnect. Delivered via
    /// the error notification source, not thrown synchronously.
    #[error("transport engine: {0}")]
    Transport(String),

    /// The caller's cancellation token fired. Engine resources have been
    /// released before this is returned.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation was attempted after an explicit close.
    #[error("campfire is closed")]
    Closed,

    /// The rendezvous window elapsed without a peer. Distinct from an
    /// error: nothing broke, nobody came.
    #[error("rendezvous window expired")]
    Expired,

    /// An input was fed to the state machine in a state that cannot accept
    /// it.
    #[error("invalid transition: cannot {operation} in {state:?}")]
    InvalidTransition {
        /// State when the input arrived.
        state: RendezvousState,
        /// The input that was rejected.
        operation: &'static str,
    },
}

impl SessionError {
    /// Whether a fresh rendezvous attempt (same URI, new window) might
    /// succeed.
    ///
    /// Input errors (`Uri`, `NoRelay`) never do — the URI itself needs
    /// fixing. `Closed` and `Cancelled` reflect caller decisions, not
    /// failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_expiry_are_retryable() {
        assert!(SessionError::Transport("ice failed".to_string()).is_retryable());
        assert!(SessionError::Expired.is_retryable());
    }

    #[test]
    fn input_and_caller_errors_are_not_retryable() {
        assert!(!SessionError::NoRelay.is_retryable());
        assert!(!SessionError::Closed.is_retryable());
        assert!(!SessionError::Cancelled.is_retryable());
        assert!(
            !SessionError::Uri(UriError::Malformed("nope".to_string())).is_retryable()
        );
    }
}
