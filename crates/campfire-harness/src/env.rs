//! Virtual-time environment for deterministic tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use campfire_core::Environment;

/// Test environment backed by tokio's virtual clock.
///
/// Run under `#[tokio::test(start_paused = true)]`: sleeps auto-advance
/// instantly once every task is idle, so a 30-minute rendezvous window
/// elapses in microseconds of real time. The wall clock is the configured
/// base plus tokio-time elapsed since construction, keeping hour-bucket
/// math consistent with the sleeps that drive expiry.
#[derive(Clone)]
pub struct HarnessEnv {
    base_secs: u64,
    started: tokio::time::Instant,
    counter: Arc<AtomicU64>,
}

impl HarnessEnv {
    /// Create an environment whose wall clock starts at `base_secs`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn at(base_secs: u64) -> Self {
        Self {
            base_secs,
            started: tokio::time::Instant::now(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Environment for HarnessEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock_secs(&self) -> u64 {
        self.base_secs + self.started.elapsed().as_secs()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // Deterministic counter stream; uniqueness matters, secrecy does
        // not, in tests.
        for byte in buffer.iter_mut() {
            *byte = (self.counter.fetch_add(1, Ordering::SeqCst) % 251) as u8;
        }
    }
}
