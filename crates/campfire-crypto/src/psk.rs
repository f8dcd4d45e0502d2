//! Pre-shared key generation.

use std::fmt;

use zeroize::Zeroize;

/// Standard length of a generated PSK in symbols.
pub const PSK_SIZE: usize = 32;

/// The 62-symbol alphabet PSKs are drawn from.
pub const PSK_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A pre-shared key: the sole secret coordinating two peers.
///
/// Generated once per campfire and distributed out-of-band, typically as the
/// fragment of a campfire URI. Immutable after creation; the backing memory
/// is zeroized on drop.
///
/// # Bias
///
/// Each output symbol is a uniformly random byte reduced modulo 62. Since
/// 256 mod 62 ≠ 0, symbols `a` through `h` are slightly more likely than
/// the rest (5/256 vs 4/256 per symbol). Acceptable for a human-shareable
/// rendezvous secret; do not treat the output as perfectly uniform key
/// material.
#[derive(Clone, PartialEq, Eq)]
pub struct Psk(String);

impl Psk {
    /// Map raw entropy into a PSK over [`PSK_ALPHABET`], one symbol per
    /// entropy byte.
    ///
    /// The caller provides the entropy (an `Environment` in production, a
    /// fixed buffer in tests). Each byte is reduced modulo the alphabet
    /// length; see the type-level note on the resulting bias.
    pub fn from_entropy(entropy: &[u8]) -> Self {
        let chars: Vec<u8> =
            entropy.iter().map(|b| PSK_ALPHABET[usize::from(*b) % PSK_ALPHABET.len()]).collect();
        let Ok(text) = String::from_utf8(chars) else {
            unreachable!("alphabet symbols are ASCII");
        };
        Self(text)
    }

    /// Wrap an existing PSK string (e.g. taken from a URI fragment).
    pub fn from_string(raw: String) -> Self {
        Self(raw)
    }

    /// The PSK as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The PSK bytes, as used for HMAC keying.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Psk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        f.write_str("Psk(..)")
    }
}

impl Drop for Psk {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn entropy_from_counter(i: u32) -> [u8; PSK_SIZE] {
        // Base-62 digits survive the modulo mapping unchanged, so distinct
        // counters are guaranteed to yield distinct PSKs.
        let mut out = [0u8; PSK_SIZE];
        let mut rest = i;
        for byte in out.iter_mut().take(6) {
            *byte = (rest % 62) as u8;
            rest /= 62;
        }
        let mut state = i.wrapping_mul(2_654_435_761).wrapping_add(1);
        for byte in out.iter_mut().skip(6) {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *byte = (state >> 24) as u8;
        }
        out
    }

    #[test]
    fn psk_has_exact_length() {
        let psk = Psk::from_entropy(&[0u8; PSK_SIZE]);
        assert_eq!(psk.as_str().len(), PSK_SIZE);
    }

    #[test]
    fn psk_uses_only_alphabet_symbols() {
        let psk = Psk::from_entropy(&entropy_from_counter(7));
        for b in psk.as_bytes() {
            assert!(PSK_ALPHABET.contains(b), "symbol {b:#04x} outside alphabet");
        }
    }

    #[test]
    fn modulo_reduction_covers_full_alphabet() {
        let mut seen = HashSet::new();
        for i in 0..=255u8 {
            let mut entropy = [0u8; PSK_SIZE];
            entropy[0] = i;
            let psk = Psk::from_entropy(&entropy);
            seen.insert(psk.as_bytes()[0]);
        }
        assert_eq!(seen.len(), PSK_ALPHABET.len());
    }

    #[test]
    fn ten_thousand_psks_have_no_duplicates() {
        let mut seen = HashSet::new();
        for i in 0..10_000 {
            let psk = Psk::from_entropy(&entropy_from_counter(i));
            assert_eq!(psk.as_str().len(), PSK_SIZE);
            assert!(seen.insert(psk.as_str().to_string()), "duplicate PSK at draw {i}");
        }
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let psk = Psk::from_entropy(&entropy_from_counter(3));
        let printed = format!("{psk:?}");
        assert!(!printed.contains(psk.as_str()));
    }
}
