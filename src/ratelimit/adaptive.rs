use super::limiter::Decision;

/// Target response time (ms) and error rate the adaptive algorithm scales
/// the limit toward.
pub const TARGET_RESPONSE_MS: f64 = 200.0;
pub const TARGET_ERROR_RATE: f64 = 0.10;

/// Fixed-window base with a dynamic limit recomputed at each window
/// boundary from the *previous* window's moving-average response time and
/// error rate, fed in via [`record_outcome`]. New algorithm — absent from
/// the teacher, which only has the three static algorithms.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    base_limit: f64,
    current_limit: f64,
    window_start_ms: u64,
    count: u32,
    response_time_sum_ms: f64,
    response_count: u32,
    error_count: u32,
    total_count: u32,
}

impl AdaptiveState {
    pub fn new(base_limit: f64) -> Self {
        AdaptiveState {
            base_limit,
            current_limit: base_limit,
            window_start_ms: 0,
            count: 0,
            response_time_sum_ms: 0.0,
            response_count: 0,
            error_count: 0,
            total_count: 0,
        }
    }

    pub fn current_limit(&self) -> f64 {
        self.current_limit
    }

    /// Feeds a completed request's outcome into this window's stats, used
    /// to recompute the limit when the window next rolls over.
    pub fn record_outcome(&mut self, response_time_ms: f64, is_error: bool) {
        self.response_time_sum_ms += response_time_ms;
        self.response_count += 1;
        self.total_count += 1;
        if is_error {
            self.error_count += 1;
        }
    }

    fn roll_window(&mut self, new_window_start: u64) {
        let avg_response = if self.response_count > 0 {
            self.response_time_sum_ms / self.response_count as f64
        } else {
            TARGET_RESPONSE_MS
        };
        let error_rate = if self.total_count > 0 {
            self.error_count as f64 / self.total_count as f64
        } else {
            0.0
        };

        let mut new_limit = self.current_limit;
        if avg_response > TARGET_RESPONSE_MS {
            new_limit *= TARGET_RESPONSE_MS / avg_response;
        } else if error_rate > TARGET_ERROR_RATE {
            new_limit *= TARGET_ERROR_RATE / error_rate;
        } else if avg_response < 0.8 * TARGET_RESPONSE_MS && error_rate < 0.5 * TARGET_ERROR_RATE {
            new_limit *= 1.1;
        }
        self.current_limit = new_limit.clamp(0.5 * self.base_limit, 2.0 * self.base_limit);

        self.window_start_ms = new_window_start;
        self.count = 0;
        self.response_time_sum_ms = 0.0;
        self.response_count = 0;
        self.error_count = 0;
        self.total_count = 0;
    }
}

pub fn consume(state: &mut AdaptiveState, window_ms: u64, now_epoch_ms: u64) -> Decision {
    let window_start = (now_epoch_ms / window_ms) * window_ms;
    if window_start != state.window_start_ms {
        state.roll_window(window_start);
    }

    if (state.count as f64) < state.current_limit {
        state.count += 1;
        Decision {
            allowed: true,
            remaining: (state.current_limit - state.count as f64).max(0.0) as u64,
            retry_after_ms: None,
        }
    } else {
        let reset_at = state.window_start_ms + window_ms;
        Decision {
            allowed: false,
            remaining: 0,
            retry_after_ms: Some(reset_at.saturating_sub(now_epoch_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_responses_shrink_the_limit() {
        let mut state = AdaptiveState::new(100.0);
        for _ in 0..10 {
            state.record_outcome(500.0, false);
        }
        // Roll into the next window.
        let _ = consume(&mut state, 1000, 1000);
        assert!(state.current_limit() < 100.0);
    }

    #[test]
    fn healthy_traffic_grows_the_limit_up_to_the_clamp() {
        let mut state = AdaptiveState::new(100.0);
        for _ in 0..10 {
            state.record_outcome(50.0, false);
        }
        let _ = consume(&mut state, 1000, 1000);
        assert!(state.current_limit() > 100.0);
        assert!(state.current_limit() <= 200.0);
    }
}
