use super::limiter::Decision;
use futures::future::BoxFuture;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A distributed limiter backing. Any store providing a compare-and-update
/// with equivalent atomicity to the in-process algorithms satisfies this
/// contract — the spec treats the source's scripted updates as reference
/// semantics, not required implementation artifacts.
pub trait RemoteLimiterBackend: Send + Sync {
    fn consume_token_bucket<'a>(
        &'a self,
        key: &'a str,
        refill_rate_per_sec: f64,
        burst: f64,
    ) -> BoxFuture<'a, Result<Decision, String>>;

    fn consume_sliding_window<'a>(
        &'a self,
        key: &'a str,
        limit: u32,
        window_ms: u64,
    ) -> BoxFuture<'a, Result<Decision, String>>;

    fn consume_fixed_window<'a>(
        &'a self,
        key: &'a str,
        limit: u32,
        window_ms: u64,
    ) -> BoxFuture<'a, Result<Decision, String>>;
}

/// An in-memory stand-in satisfying [`RemoteLimiterBackend`] for tests and
/// for environments with no external store configured, so "distributed
/// mode" and "local mode" share one call path in the engine.
#[derive(Default)]
pub struct InMemoryRemoteBackend {
    inner: dashmap::DashMap<String, super::token_bucket::TokenBucketState>,
    sliding: dashmap::DashMap<String, super::sliding_window::SlidingWindowState>,
    fixed: dashmap::DashMap<String, super::fixed_window::FixedWindowState>,
}

impl RemoteLimiterBackend for InMemoryRemoteBackend {
    fn consume_token_bucket<'a>(
        &'a self,
        key: &'a str,
        refill_rate_per_sec: f64,
        burst: f64,
    ) -> BoxFuture<'a, Result<Decision, String>> {
        Box::pin(async move {
            let now = std::time::Instant::now();
            let mut entry = self
                .inner
                .entry(key.to_string())
                .or_insert_with(|| super::token_bucket::TokenBucketState::new(burst, now));
            Ok(super::token_bucket::consume(&mut entry, refill_rate_per_sec, burst, now))
        })
    }

    fn consume_sliding_window<'a>(
        &'a self,
        key: &'a str,
        limit: u32,
        window_ms: u64,
    ) -> BoxFuture<'a, Result<Decision, String>> {
        Box::pin(async move {
            let now = std::time::Instant::now();
            let mut entry = self.sliding.entry(key.to_string()).or_default();
            Ok(super::sliding_window::consume(&mut entry, limit, Duration::from_millis(window_ms), now))
        })
    }

    fn consume_fixed_window<'a>(
        &'a self,
        key: &'a str,
        limit: u32,
        window_ms: u64,
    ) -> BoxFuture<'a, Result<Decision, String>> {
        Box::pin(async move {
            let mut entry = self.fixed.entry(key.to_string()).or_default();
            Ok(super::fixed_window::consume(&mut entry, limit, window_ms, epoch_ms()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_bucket_admits_up_to_burst_then_denies() {
        let backend = InMemoryRemoteBackend::default();
        for _ in 0..3 {
            let decision = backend.consume_token_bucket("k", 0.001, 3.0).await.unwrap();
            assert!(decision.allowed);
        }
        let denied = backend.consume_token_bucket("k", 0.001, 3.0).await.unwrap();
        assert!(!denied.allowed);
    }

    #[tokio::test]
    async fn sliding_window_admits_up_to_limit_then_denies() {
        let backend = InMemoryRemoteBackend::default();
        assert!(backend.consume_sliding_window("k", 2, 1000).await.unwrap().allowed);
        assert!(backend.consume_sliding_window("k", 2, 1000).await.unwrap().allowed);
        assert!(!backend.consume_sliding_window("k", 2, 1000).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn fixed_window_admits_up_to_limit_then_denies() {
        let backend = InMemoryRemoteBackend::default();
        assert!(backend.consume_fixed_window("k", 2, 60_000).await.unwrap().allowed);
        assert!(backend.consume_fixed_window("k", 2, 60_000).await.unwrap().allowed);
        assert!(!backend.consume_fixed_window("k", 2, 60_000).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn distinct_keys_are_independent_across_algorithms() {
        let backend = InMemoryRemoteBackend::default();
        assert!(backend.consume_fixed_window("a", 1, 60_000).await.unwrap().allowed);
        assert!(backend.consume_fixed_window("b", 1, 60_000).await.unwrap().allowed);
    }
}
