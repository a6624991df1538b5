use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Mirrors `services::circuit_breaker::CircuitState`'s numeric encoding so
/// the atomic state tag round-trips the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit is open")]
    CircuitOpen,
    #[error("operation failed: {0}")]
    OperationFailed(E),
}

/// Volume threshold + failure-fraction gating, replacing the teacher's
/// consecutive-failure-count config.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Minimum requests observed since the last CLOSED entry before the
    /// breaker is permitted to open.
    pub volume_threshold: u32,
    /// Fraction of failures (over `volume_threshold`+ requests) that opens
    /// the breaker.
    pub failure_threshold_fraction: f64,
    /// Consecutive successes in HALF_OPEN required to close.
    pub success_threshold: u32,
    /// How long the breaker stays OPEN before allowing a HALF_OPEN probe.
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            volume_threshold: 10,
            failure_threshold_fraction: 0.5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitStatistics {
    pub state: CircuitState,
    pub total: u64,
    pub failures: u64,
    pub half_open_successes: u32,
}

/// Per-upstream circuit breaker. Shape (atomic state tag, `RwLock`-guarded
/// timing field, `call()` wrapper) grounded in
/// `services::circuit_breaker::CircuitBreaker`.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    total: AtomicU64,
    failures: AtomicU64,
    half_open_successes: AtomicU32,
    earliest_next_attempt: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Arc<Self> {
        Arc::new(CircuitBreaker {
            name: name.into(),
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            total: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            half_open_successes: AtomicU32::new(0),
            earliest_next_attempt: RwLock::new(None),
        })
    }

    pub fn get_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn statistics(&self) -> CircuitStatistics {
        CircuitStatistics {
            state: self.get_state(),
            total: self.total.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            half_open_successes: self.half_open_successes.load(Ordering::Relaxed),
        }
    }

    /// Whether a call is currently permitted. Transitions OPEN -> HALF_OPEN
    /// as a side effect when the timeout has elapsed.
    pub fn can_execute(&self, now: Instant) -> bool {
        match self.get_state() {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let next = *self.earliest_next_attempt.read().unwrap();
                match next {
                    Some(t) if now >= t => {
                        self.transition_to_half_open();
                        true
                    }
                    Some(_) => false,
                    None => true,
                }
            }
        }
    }

    /// Runs `operation`, recording the outcome against this breaker's state
    /// machine. Rejects immediately with `CircuitOpen` if not permitted.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = Instant::now();
        if !self.can_execute(now) {
            return Err(CircuitBreakerError::CircuitOpen);
        }
        match operation().await {
            Ok(value) => {
                self.on_success(now);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(now);
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// A success in CLOSED only feeds `total` — it never zeroes the
    /// failure count. The volume+fraction gate is evaluated here too, since
    /// the fraction can still cross `failure_threshold_fraction` on a call
    /// that itself succeeded (the fraction is over the whole window, not
    /// just the latest call).
    pub fn on_success(&self, now: Instant) {
        match self.get_state() {
            CircuitState::Closed => {
                let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;
                let failures = self.failures.load(Ordering::Relaxed);
                if total >= self.config.volume_threshold as u64
                    && (failures as f64 / total as f64) >= self.config.failure_threshold_fraction
                {
                    self.transition_to_open(now);
                }
            }
            CircuitState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::Relaxed) + 1;
                if successes >= self.config.success_threshold {
                    self.transition_to_closed();
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn on_failure(&self, now: Instant) {
        match self.get_state() {
            CircuitState::Closed => {
                let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                if total >= self.config.volume_threshold as u64
                    && (failures as f64 / total as f64) >= self.config.failure_threshold_fraction
                {
                    self.transition_to_open(now);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to_open(now);
                self.half_open_successes.store(0, Ordering::Relaxed);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_open(&self, now: Instant) {
        warn!("circuit '{}' opening", self.name);
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        *self.earliest_next_attempt.write().unwrap() = Some(now + self.config.timeout);
    }

    fn transition_to_half_open(&self) {
        debug!("circuit '{}' probing (half-open)", self.name);
        self.half_open_successes.store(0, Ordering::Relaxed);
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
    }

    fn transition_to_closed(&self) {
        debug!("circuit '{}' closing", self.name);
        self.total.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.half_open_successes.store(0, Ordering::Relaxed);
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        *self.earliest_next_attempt.write().unwrap() = None;
    }

    /// Operator hook: force the breaker open regardless of counters.
    pub fn force_open(&self) {
        self.transition_to_open(Instant::now());
    }

    /// Operator hook: force the breaker closed, resetting counters.
    pub fn force_close(&self) {
        self.transition_to_closed();
    }

    /// Operator hook: alias for `force_close`, named for parity with the
    /// reset-to-fresh-state operation described in the spec.
    pub fn reset(&self) {
        self.transition_to_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            volume_threshold: 10,
            failure_threshold_fraction: 0.5,
            success_threshold: 2,
            timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn stays_closed_under_threshold() {
        let cb = CircuitBreaker::new("test", cfg());
        for _ in 0..5 {
            let _ = cb.call(|| async { Err::<(), &str>("boom") }).await;
        }
        assert_eq!(cb.get_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_volume_and_fraction_exceeded() {
        let cb = CircuitBreaker::new("test", cfg());
        for i in 0..10 {
            let result = if i < 6 {
                cb.call(|| async { Err::<(), &str>("boom") }).await
            } else {
                cb.call(|| async { Ok::<(), &str>(()) }).await
            };
            let _ = result;
        }
        assert_eq!(cb.get_state(), CircuitState::Open);
        let next = cb.call(|| async { Ok::<i32, &str>(1) }).await;
        assert!(matches!(next, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new("test", cfg());
        for _ in 0..10 {
            let _ = cb.call(|| async { Err::<(), &str>("boom") }).await;
        }
        assert_eq!(cb.get_state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(60)).await;
        let result = cb.call(|| async { Err::<(), &str>("still broken") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        assert_eq!(cb.get_state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_success_threshold_closes() {
        let cb = CircuitBreaker::new("test", cfg());
        for _ in 0..10 {
            let _ = cb.call(|| async { Err::<(), &str>("boom") }).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        let _ = cb.call(|| async { Ok::<(), &str>(()) }).await;
        assert_eq!(cb.get_state(), CircuitState::HalfOpen);
        let _ = cb.call(|| async { Ok::<(), &str>(()) }).await;
        assert_eq!(cb.get_state(), CircuitState::Closed);
    }
}
