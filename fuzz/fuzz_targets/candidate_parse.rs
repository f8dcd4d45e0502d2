//! Fuzz target for relay candidate parsing
//!
//! Arbitrary candidate strings must either parse into a well-formed
//! candidate or return an error - never panic.

#![no_main]

use campfire_proto::{NO_CREDENTIAL, RelayCandidate};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(candidate) = RelayCandidate::parse_turn(data) {
        assert!(!candidate.host.is_empty());
        // Credentials are all-or-nothing.
        assert_eq!(
            candidate.username == NO_CREDENTIAL,
            candidate.credential == NO_CREDENTIAL,
        );
    }
    if let Ok(candidate) = RelayCandidate::parse_stun(data) {
        assert!(!candidate.host.is_empty());
        assert_eq!(candidate.username, NO_CREDENTIAL);
    }
});
