use super::limiter::Decision;

/// Window boundaries aligned to `floor(now/window)*window` in wall-clock
/// epoch milliseconds, unlike the teacher's `check_fixed_window`, which
/// simply reset whenever `now - window_start >= window_duration` — that
/// drifts the window boundary forward on every reset instead of pinning it
/// to a fixed grid, which is what "fixed window" is supposed to mean.
#[derive(Debug, Clone, Default)]
pub struct FixedWindowState {
    pub window_start_ms: u64,
    pub count: u32,
}

pub fn consume(
    state: &mut FixedWindowState,
    limit: u32,
    window_ms: u64,
    now_epoch_ms: u64,
) -> Decision {
    let window_start = (now_epoch_ms / window_ms) * window_ms;
    if window_start != state.window_start_ms {
        state.window_start_ms = window_start;
        state.count = 0;
    }

    if state.count < limit {
        state.count += 1;
        Decision {
            allowed: true,
            remaining: (limit - state.count) as u64,
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
    fn aligns_to_fixed_grid_not_rolling_reset() {
        let mut state = FixedWindowState::default();
        let window_ms = 1000;
        // Both calls land in the same [0,1000) window.
        assert!(consume(&mut state, 2, window_ms, 100).allowed);
        assert!(consume(&mut state, 2, window_ms, 900).allowed);
        let denied = consume(&mut state, 2, window_ms, 950);
        assert!(!denied.allowed);
        // Crossing into the next grid window resets the counter.
        let admitted = consume(&mut state, 2, window_ms, 1000);
        assert!(admitted.allowed);
    }
}
