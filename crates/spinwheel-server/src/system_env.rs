//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` uses the real monotonic clock and OS entropy. Production
//! behavior is non-deterministic; the simulation harness swaps in a seeded
//! environment.

use spinwheel_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// Session IDs come from getrandom, so they are not guessable by peers.
///
/// # Panics
///
/// Panics if the OS RNG fails. A server that cannot draw session IDs cannot
/// tell connections apart.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - session IDs would collide");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn system_env_session_ids_differ() {
        let env = SystemEnv::new();

        // Extremely unlikely to collide if random
        assert_ne!(env.random_u64(), env.random_u64());
    }
}
