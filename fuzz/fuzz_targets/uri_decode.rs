//! Fuzz target for CampfireUri::decode
//!
//! Feeds arbitrary strings to the URI parser to find:
//! - Parser crashes or panics
//! - Slicing outside char boundaries
//! - Round-trip violations for inputs that do decode
//!
//! The parser should NEVER panic; invalid inputs return Err. Any value that
//! decodes must survive encode+decode unchanged.

#![no_main]

use campfire_proto::CampfireUri;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(uri) = CampfireUri::decode(data) {
        let encoded = uri.encode();
        let reparsed = CampfireUri::decode(&encoded).expect("encoded URI must decode");
        // Zero-candidate URIs gain the injected default TURN candidate;
        // everything else must round-trip exactly.
        if !uri.turn_servers.is_empty()
            || !uri.stun_servers.is_empty()
            || !uri.websocket_servers.is_empty()
            || !uri.http_servers.is_empty()
        {
            assert_eq!(reparsed, uri);
        }
    }
});
