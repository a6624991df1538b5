use super::adaptive::{self, AdaptiveState};
use super::fixed_window::{self, FixedWindowState};
use super::remote::RemoteLimiterBackend;
use super::sliding_window::{self, SlidingWindowState};
use super::token_bucket::{self, TokenBucketState};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Result of a single `consume(key)` call.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    pub retry_after_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Algorithm {
    TokenBucket {
        capacity: f64,
        refill_rate_per_sec: f64,
        #[serde(default)]
        burst: Option<f64>,
    },
    SlidingWindow {
        limit: u32,
        window_ms: u64,
    },
    FixedWindow {
        limit: u32,
        window_ms: u64,
    },
    Adaptive {
        base_limit: f64,
        window_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    pub algorithm: Algorithm,
}

enum KeyState {
    TokenBucket(TokenBucketState),
    SlidingWindow(SlidingWindowState),
    FixedWindow(FixedWindowState),
    Adaptive(AdaptiveState),
}

/// Sharded per-key rate limiter store. Generalizes
/// `middleware::rate_limit::RateLimitStore`'s single
/// `RwLock<HashMap<String, RateLimitEntry>>` into a `DashMap` so concurrent
/// operations on different keys never contend, and returns the
/// `{allowed, remaining, resetAt, retryAfter}` contract the teacher's
/// boolean `check_rate_limit` didn't.
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: DashMap<String, Mutex<KeyState>>,
    last_cleanup: Mutex<Instant>,
    backend: Option<Arc<dyn RemoteLimiterBackend>>,
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        RateLimiter {
            config,
            entries: DashMap::new(),
            last_cleanup: Mutex::new(Instant::now()),
            backend: None,
        }
    }

    /// Same local algorithms, but `consume_distributed` delegates to a
    /// shared store instead of this process's own `entries` map — for
    /// deployments running more than one gateway instance against one key
    /// space.
    pub fn with_backend(config: RateLimiterConfig, backend: Arc<dyn RemoteLimiterBackend>) -> Self {
        RateLimiter {
            config,
            entries: DashMap::new(),
            last_cleanup: Mutex::new(Instant::now()),
            backend: Some(backend),
        }
    }

    /// Consumes against the configured remote backend when one is set,
    /// falling back to the local in-process algorithm otherwise. Adaptive
    /// rate limiting has no distributed form (its state is per-instance
    /// response-time history) and always runs locally.
    pub async fn consume_distributed(&self, key: &str) -> Result<Decision, String> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Ok(self.consume(key)),
        };
        match self.config.algorithm {
            Algorithm::TokenBucket { capacity, refill_rate_per_sec, burst } => {
                backend
                    .consume_token_bucket(key, refill_rate_per_sec, burst.unwrap_or(capacity))
                    .await
            }
            Algorithm::SlidingWindow { limit, window_ms } => {
                backend.consume_sliding_window(key, limit, window_ms).await
            }
            Algorithm::FixedWindow { limit, window_ms } => {
                backend.consume_fixed_window(key, limit, window_ms).await
            }
            Algorithm::Adaptive { .. } => Ok(self.consume(key)),
        }
    }

    fn epoch_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    pub fn consume(&self, key: &str) -> Decision {
        self.maybe_cleanup();
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(self.fresh_state(now)));
        let mut state = entry.lock().unwrap();
        match (&mut *state, self.config.algorithm) {
            (
                KeyState::TokenBucket(s),
                Algorithm::TokenBucket {
                    refill_rate_per_sec,
                    burst,
                    capacity,
                },
            ) => token_bucket::consume(s, refill_rate_per_sec, burst.unwrap_or(capacity), now),
            (KeyState::SlidingWindow(s), Algorithm::SlidingWindow { limit, window_ms }) => {
                sliding_window::consume(s, limit, Duration::from_millis(window_ms), now)
            }
            (KeyState::FixedWindow(s), Algorithm::FixedWindow { limit, window_ms }) => {
                fixed_window::consume(s, limit, window_ms, Self::epoch_ms())
            }
            (KeyState::Adaptive(s), Algorithm::Adaptive { window_ms, .. }) => {
                adaptive::consume(s, window_ms, Self::epoch_ms())
            }
            _ => unreachable!("KeyState variant always matches the configured algorithm"),
        }
    }

    /// Feeds a completed request's outcome back into the adaptive
    /// algorithm's window stats. No-op for the other algorithms.
    pub fn record_outcome(&self, key: &str, response_time_ms: f64, is_error: bool) {
        if let Some(entry) = self.entries.get(key) {
            if let KeyState::Adaptive(s) = &mut *entry.lock().unwrap() {
                s.record_outcome(response_time_ms, is_error);
            }
        }
    }

    fn fresh_state(&self, now: Instant) -> KeyState {
        match self.config.algorithm {
            Algorithm::TokenBucket { capacity, burst, .. } => {
                KeyState::TokenBucket(TokenBucketState::new(burst.unwrap_or(capacity), now))
            }
            Algorithm::SlidingWindow { .. } => KeyState::SlidingWindow(SlidingWindowState::default()),
            Algorithm::FixedWindow { .. } => KeyState::FixedWindow(FixedWindowState::default()),
            Algorithm::Adaptive { base_limit, .. } => KeyState::Adaptive(AdaptiveState::new(base_limit)),
        }
    }

    /// Lazily evicts keys untouched for a while, at most once per
    /// `CLEANUP_INTERVAL`, mirroring `RateLimitStore::cleanup_expired_entries`'s
    /// "at most every 300s" throttle.
    fn maybe_cleanup(&self) {
        let mut last = self.last_cleanup.lock().unwrap();
        if last.elapsed() < CLEANUP_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);
        // Sharded maps don't expose idle-time directly; a size cap keeps
        // this bounded in practice. Full idle-based eviction is left to a
        // background compaction task the engine can schedule.
        if self.entries.len() > 1_000_000 {
            self.entries.clear();
        }
    }
}
