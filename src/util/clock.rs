//! Monotonic time seam.
//!
//! The circuit breaker, health checker, and rate limiters all reason about
//! elapsed time. Routing every `Instant::now()` call through this trait lets
//! their tests advance time deterministically instead of sleeping in
//! real time.

use std::time::Instant;

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real wall clock, backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A clock that only advances when told to, for deterministic tests.
    pub struct MockClock {
        base: Instant,
        offset_ms: AtomicU64,
    }

    impl MockClock {
        pub fn new() -> Self {
            MockClock {
                base: Instant::now(),
                offset_ms: AtomicU64::new(0),
            }
        }

        pub fn advance(&self, ms: u64) {
            self.offset_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            self.base + std::time::Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
        }
    }
}
