use std::time::Instant;

use super::limiter::Decision;

/// Tokens are clamped to `[0, burst]`. Refilled lazily at each call based on
/// elapsed time, rather than a background ticker — the same idiom the
/// teacher's `check_token_bucket` uses.
#[derive(Debug, Clone)]
pub struct TokenBucketState {
    pub tokens: f64,
    pub last_refill: Instant,
}

impl TokenBucketState {
    pub fn new(initial_tokens: f64, now: Instant) -> Self {
        TokenBucketState {
            tokens: initial_tokens,
            last_refill: now,
        }
    }
}

/// capacity: C, refill_rate: tokens/sec, burst: clamp ceiling (defaults to
/// capacity when equal).
pub fn consume(
    state: &mut TokenBucketState,
    refill_rate_per_sec: f64,
    burst: f64,
    now: Instant,
) -> Decision {
    let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
    state.tokens = (state.tokens + elapsed * refill_rate_per_sec).min(burst);
    state.last_refill = now;

    if state.tokens >= 1.0 {
        state.tokens -= 1.0;
        Decision {
            allowed: true,
            remaining: state.tokens.floor() as u64,
            retry_after_ms: None,
        }
    } else {
        let deficit = 1.0 - state.tokens;
        let retry_after_ms = if refill_rate_per_sec > 0.0 {
            (deficit / refill_rate_per_sec * 1000.0).ceil() as u64
        } else {
            u64::MAX
        };
        Decision {
            allowed: false,
            remaining: 0,
            retry_after_ms: Some(retry_after_ms),
        }
    }
}
