//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness).
//! Production uses real clocks and the OS CSPRNG; tests pin the wall clock
//! so temporal keys are reproducible.

use std::time::Duration;

use campfire_crypto::Psk;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time as unix seconds.
    ///
    /// This is what the hour bucket — and therefore every temporal key —
    /// is computed from. Rendezvous only works when both peers' wall
    /// clocks agree to within the bucket window.
    fn wall_clock_secs(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// The only async method in the trait; used by driver code (expiry
    /// timers), never by protocol logic.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`, for request and attempt identifiers.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Generate a fresh PSK of `length` symbols from the environment's entropy
/// source. The standard length is [`PSK_SIZE`].
///
/// Fails only if the entropy source does — which the environment treats as
/// fatal and non-retryable in-process, so this function itself is
/// infallible.
pub fn generate_psk<E: Environment>(env: &E, length: usize) -> Psk {
    let mut entropy = vec![0u8; length];
    env.random_bytes(&mut entropy);
    Psk::from_entropy(&entropy)
}


#[cfg(test)]
mod tests {
    use campfire_crypto::{PSK_ALPHABET, PSK_SIZE};

    use super::{generate_psk, test_env::TestEnv};

    #[test]
    fn generated_psk_has_length_and_alphabet() {
        let env = TestEnv::at(0);
        let psk = generate_psk(&env, PSK_SIZE);
        assert_eq!(psk.as_str().len(), PSK_SIZE);
        assert!(psk.as_bytes().iter().all(|b| PSK_ALPHABET.contains(b)));
    }

    #[test]
    fn generated_psk_honors_the_requested_length() {
        let env = TestEnv::at(0);
        assert_eq!(generate_psk(&env, 8).as_str().len(), 8);
        assert_eq!(generate_psk(&env, 64).as_str().len(), 64);
    }

    #[test]
    fn successive_psks_differ() {
        let env = TestEnv::at(0);
        let a = generate_psk(&env, PSK_SIZE);
        let b = generate_psk(&env, PSK_SIZE);
        assert_ne!(a.as_str(), b.as_str());
    }
}
