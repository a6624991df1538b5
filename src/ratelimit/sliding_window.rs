use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::limiter::Decision;

/// Arrival timestamps within the trailing window. Old entries are dropped
/// lazily on each call, mirroring `check_sliding_window`'s retain-based
/// approach but with a deque so the common case (old entries at the front)
/// is O(evicted) rather than O(n) per call.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindowState {
    pub timestamps: VecDeque<Instant>,
}

pub fn consume(
    state: &mut SlidingWindowState,
    limit: u32,
    window: Duration,
    now: Instant,
) -> Decision {
    while let Some(&front) = state.timestamps.front() {
        if now.saturating_duration_since(front) >= window {
            state.timestamps.pop_front();
        } else {
            break;
        }
    }

    if (state.timestamps.len() as u32) < limit {
        state.timestamps.push_back(now);
        Decision {
            allowed: true,
            remaining: (limit - state.timestamps.len() as u32) as u64,
            retry_after_ms: None,
        }
    } else {
        let oldest = *state.timestamps.front().unwrap();
        let retry_after = window.saturating_sub(now.saturating_duration_since(oldest));
        Decision {
            allowed: false,
            remaining: 0,
            retry_after_ms: Some(retry_after.as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_within_limit_then_denies_then_ages_out() {
        let base = Instant::now();
        let mut state = SlidingWindowState::default();
        let window = Duration::from_millis(1000);

        assert!(consume(&mut state, 3, window, base).allowed);
        assert!(consume(&mut state, 3, window, base + Duration::from_millis(100)).allowed);
        assert!(consume(&mut state, 3, window, base + Duration::from_millis(200)).allowed);
        let denied = consume(&mut state, 3, window, base + Duration::from_millis(300));
        assert!(!denied.allowed);

        let admitted = consume(&mut state, 3, window, base + Duration::from_millis(1001));
        assert!(admitted.allowed);
    }
}
