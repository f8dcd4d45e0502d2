//! Fuzz target for PSK mapping and temporal key folding
//!
//! Derivation is pure string/byte manipulation; none of it may panic, and
//! the structural invariants (lengths, alphabets) must hold for any input.

#![no_main]

use campfire_crypto::{HourBucket, PSK_ALPHABET, PSK_SIZE, Psk, derive_temporal_key, fold_numeric};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() >= PSK_SIZE {
        let mut entropy = [0u8; PSK_SIZE];
        entropy.copy_from_slice(&data[..PSK_SIZE]);
        let psk = Psk::from_entropy(&entropy);
        assert_eq!(psk.as_str().len(), PSK_SIZE);
        assert!(psk.as_bytes().iter().all(|b| PSK_ALPHABET.contains(b)));
    }

    let secs = data.iter().take(8).fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    // Clamp to chrono's representable range.
    let bucket = HourBucket::from_unix_secs(secs % 4_000_000_000);
    let key = derive_temporal_key(data, bucket, "offer");
    assert_eq!(key.len(), 64);

    let folded = fold_numeric(&key);
    assert_eq!(folded.len(), 64);
    assert!(folded.bytes().all(|b| b.is_ascii_digit()));
});
