//! Temporal key derivation.
//!
//! A temporal key is `HMAC-SHA256(key = PSK, message = hour_bucket || tag)`,
//! hex-encoded. The hour bucket is the UTC wall clock rounded to the nearest
//! hour, so two peers computing within the same window agree byte-for-byte
//! without exchanging anything.

use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Seconds in one hour.
const HOUR_SECS: u64 = 3600;

/// A wall-clock instant rounded to the nearest UTC hour.
///
/// Constructed from unix seconds rather than a live clock so callers (and
/// tests) control the time source. All instants in `[bucket - 30min,
/// bucket + 30min)` round to the same bucket; the upper edge is therefore
/// the instant the derived keys change and the rendezvous window closes.
///
/// Nearest-hour rounding (half rounds up) means a key computed at HH:59 and
/// one computed a second later at HH+1:00 already agree, but keys computed
/// a second apart across the HH:30 boundary disagree. That skew window is
/// inherent to the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HourBucket {
    secs: u64,
}

impl HourBucket {
    /// Round unix seconds to the nearest hour.
    pub fn from_unix_secs(secs: u64) -> Self {
        Self { secs: (secs + HOUR_SECS / 2) / HOUR_SECS * HOUR_SECS }
    }

    /// Unix seconds of the rounded hour.
    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Unix seconds at which this bucket's validity window ends.
    ///
    /// Instants at or beyond this point round to the next bucket, so peers
    /// arriving after it derive different keys and can no longer meet here.
    pub fn expires_at_secs(&self) -> u64 {
        self.secs + HOUR_SECS / 2
    }

    /// The bucket as a fixed-width `YYYYMMDDHH` decimal stamp.
    ///
    /// This exact format is part of the rendezvous contract: both peers feed
    /// it into the HMAC, so it can never change without a protocol version.
    pub fn stamp(&self) -> String {
        let Some(utc) = DateTime::from_timestamp(self.secs as i64, 0) else {
            unreachable!("rounded unix seconds are always in chrono's range");
        };
        utc.format("%Y%m%d%H").to_string()
    }
}

/// Derive the temporal key for `tag` within `bucket`.
///
/// Returns the lowercase hex encoding of
/// `HMAC-SHA256(key = psk, message = stamp || tag)` (64 characters).
///
/// Deterministic and side-effect free: the only time dependency is the
/// bucket the caller passes in. This provides rendezvous coordination, not
/// confidentiality — anyone holding the PSK computes the same value.
pub fn derive_temporal_key(psk: &[u8], bucket: HourBucket, tag: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(psk) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };
    mac.update(bucket.stamp().as_bytes());
    mac.update(tag.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Fold a hex temporal key into a decimal digit string.
///
/// Each character maps to `byte % 10`. This is a legacy compatibility
/// transformation for session identifiers that must be numeric, not a
/// cryptographic step; the folded string keeps the input's length.
pub fn fold_numeric(hex_key: &str) -> String {
    hex_key.bytes().map(|b| char::from(b'0' + b % 10)).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bucket_rounds_half_up() {
        assert_eq!(HourBucket::from_unix_secs(0).as_secs(), 0);
        assert_eq!(HourBucket::from_unix_secs(1799).as_secs(), 0);
        assert_eq!(HourBucket::from_unix_secs(1800).as_secs(), 3600);
        assert_eq!(HourBucket::from_unix_secs(5399).as_secs(), 3600);
        assert_eq!(HourBucket::from_unix_secs(5400).as_secs(), 7200);
    }

    #[test]
    fn bucket_stamp_is_fixed_width_utc() {
        assert_eq!(HourBucket::from_unix_secs(0).stamp(), "1970010100");
        assert_eq!(HourBucket::from_unix_secs(1800).stamp(), "1970010101");
        // 2023-11-14 22:13:20 UTC rounds down to 22:00.
        assert_eq!(HourBucket::from_unix_secs(1_700_000_000).stamp(), "2023111422");
    }

    #[test]
    fn bucket_window_ends_half_an_hour_after_the_hour() {
        let bucket = HourBucket::from_unix_secs(1799);
        assert_eq!(bucket.expires_at_secs(), 1800);
        // The first instant past the window belongs to the next bucket.
        assert_ne!(HourBucket::from_unix_secs(bucket.expires_at_secs()), bucket);
    }

    #[test]
    fn same_inputs_same_key() {
        let bucket = HourBucket::from_unix_secs(1_700_000_000);
        let a = derive_temporal_key(b"secret", bucket, "offer");
        let b = derive_temporal_key(b"secret", bucket, "offer");
        assert_eq!(a, b);
    }

    #[test]
    fn adjacent_buckets_disagree() {
        let this_hour = HourBucket::from_unix_secs(1_700_000_000);
        let next_hour = HourBucket::from_unix_secs(1_700_000_000 + 3600);
        assert_ne!(
            derive_temporal_key(b"secret", this_hour, "offer"),
            derive_temporal_key(b"secret", next_hour, "offer"),
        );
    }

    #[test]
    fn tags_partition_the_key_space() {
        let bucket = HourBucket::from_unix_secs(1_700_000_000);
        let session = derive_temporal_key(b"secret", bucket, "session");
        let offer = derive_temporal_key(b"secret", bucket, "offer");
        let answer = derive_temporal_key(b"secret", bucket, "answer");
        assert_ne!(session, offer);
        assert_ne!(session, answer);
        assert_ne!(offer, answer);
    }

    #[test]
    fn different_psks_disagree() {
        let bucket = HourBucket::from_unix_secs(0);
        assert_ne!(
            derive_temporal_key(b"psk-one", bucket, "session"),
            derive_temporal_key(b"psk-two", bucket, "session"),
        );
    }

    #[test]
    fn fold_maps_bytes_to_decimal_digits() {
        // '0' = 48 -> 8, 'a' = 97 -> 7, 'f' = 102 -> 2
        assert_eq!(fold_numeric("0af"), "872");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn key_is_always_64_lowercase_hex_chars(
            psk in any::<Vec<u8>>(),
            secs in 0u64..4_000_000_000,
            tag in "[a-z]{1,16}",
        ) {
            let key = derive_temporal_key(&psk, HourBucket::from_unix_secs(secs), &tag);
            assert_eq!(key.len(), 64);
            assert!(key.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        }

        #[test]
        fn fold_preserves_length_and_is_numeric(input in "[0-9a-f]{0,64}") {
            let folded = fold_numeric(&input);
            assert_eq!(folded.len(), input.len());
            assert!(folded.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
