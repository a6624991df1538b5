use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One completed request, as fed to [`Recorder::record`] by the engine.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub route_id: Option<String>,
    pub consumer_id: Option<String>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub upstream_id: Option<String>,
    pub cached: bool,
    pub rate_limited: bool,
    pub arrived_at: Instant,
}

/// Aggregate metrics over the current recording window.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Snapshot {
    pub total: u64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub rate_limited_rate: f64,
    pub avg_duration_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub requests_per_sec: f64,
}

/// Keeps a bounded sliding window of completed requests and computes
/// aggregate statistics on demand. The window is capped rather than
/// time-bucketed: once `MAX_WINDOW` records accumulate, the oldest is
/// dropped on each new arrival.
const MAX_WINDOW: usize = 10_000;

pub struct Recorder {
    records: Mutex<VecDeque<RequestRecord>>,
    started: Instant,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder {
            records: Mutex::new(VecDeque::with_capacity(MAX_WINDOW)),
            started: Instant::now(),
        }
    }

    pub fn record(&self, record: RequestRecord) {
        let mut records = self.records.lock().unwrap();
        if records.len() >= MAX_WINDOW {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Computes the snapshot using the `sorted[ceil(n*p)-1]` percentile
    /// formula over a sorted copy of observed durations.
    pub fn snapshot(&self) -> Snapshot {
        let records = self.records.lock().unwrap();
        let total = records.len();
        if total == 0 {
            return Snapshot::default();
        }

        let mut durations_ms: Vec<f64> = records.iter().map(|r| r.duration.as_secs_f64() * 1000.0).collect();
        durations_ms.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let success = records.iter().filter(|r| r.status < 400).count() as f64;
        let errors = records.iter().filter(|r| r.status >= 500).count() as f64;
        let cached = records.iter().filter(|r| r.cached).count() as f64;
        let rate_limited = records.iter().filter(|r| r.rate_limited).count() as f64;
        let sum: f64 = durations_ms.iter().sum();
        let n = total as f64;

        Snapshot {
            total: total as u64,
            success_rate: success / n,
            error_rate: errors / n,
            cache_hit_rate: cached / n,
            rate_limited_rate: rate_limited / n,
            avg_duration_ms: sum / n,
            p50_ms: percentile(&durations_ms, 0.50),
            p95_ms: percentile(&durations_ms, 0.95),
            p99_ms: percentile(&durations_ms, 0.99),
            requests_per_sec: n / self.started.elapsed().as_secs_f64().max(1.0),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let idx = ((n as f64 * p).ceil() as usize).saturating_sub(1).min(n - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: u16, ms: u64) -> RequestRecord {
        RequestRecord {
            route_id: None,
            consumer_id: None,
            method: "GET".to_string(),
            path: "/x".to_string(),
            status,
            duration: Duration::from_millis(ms),
            upstream_id: None,
            cached: false,
            rate_limited: false,
            arrived_at: Instant::now(),
        }
    }

    #[test]
    fn empty_window_yields_zeroed_snapshot() {
        let recorder = Recorder::new();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total, 0);
    }

    #[test]
    fn success_and_error_rates_are_computed() {
        let recorder = Recorder::new();
        recorder.record(record(200, 10));
        recorder.record(record(500, 20));
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.success_rate, 0.5);
        assert_eq!(snapshot.error_rate, 0.5);
    }

    #[test]
    fn percentile_formula_matches_ceil_index() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&sorted, 0.50), 5.0);
        assert_eq!(percentile(&sorted, 0.90), 9.0);
    }

    #[test]
    fn window_drops_oldest_record_past_capacity() {
        let recorder = Recorder::new();
        for i in 0..(MAX_WINDOW + 10) {
            recorder.record(record(200, i as u64));
        }
        assert_eq!(recorder.snapshot().total, MAX_WINDOW as u64);
    }
}
