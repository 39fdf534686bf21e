//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (time, randomness). The
//! production server uses the system clock and OS entropy; the simulation
//! harness uses turmoil's virtual clock and a seeded RNG.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses OS entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses
    /// `tokio::time::Instant` so turmoil can drive the clock.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// Given the same seed, simulation environments produce the same bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for connection (session) identifiers.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
