use crate::models::upstream::{HealthCheckSpec, Target};
use dashmap::DashMap;
use futures::future::BoxFuture;
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-target bookkeeping. Invariant: at most one of
/// `consecutive_successes`/`consecutive_failures` is positive at any time —
/// every update resets the other to zero.
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub last_check: Option<Instant>,
    pub last_error: Option<String>,
    pub last_response_time: Option<Duration>,
}

/// How an active probe is actually sent. Abstracted so the checker's state
/// machine can be tested without a network, and so a non-HTTP transport
/// (tcp connect, grpc health check) can be slotted in.
pub trait HealthTransport: Send + Sync {
    fn probe<'a>(
        &'a self,
        target: &'a Target,
        spec: &'a HealthCheckSpec,
    ) -> BoxFuture<'a, Result<(), String>>;
}

/// The default transport: an HTTP GET against `spec.path` (or `/health`),
/// passing if the response status is in `spec.expected_status` (or any
/// 2xx when that list is empty).
pub struct ReqwestHealthTransport {
    client: reqwest::Client,
}

impl ReqwestHealthTransport {
    pub fn new() -> Self {
        ReqwestHealthTransport {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHealthTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTransport for ReqwestHealthTransport {
    fn probe<'a>(
        &'a self,
        target: &'a Target,
        spec: &'a HealthCheckSpec,
    ) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let path = spec.path.as_deref().unwrap_or("/health");
            let url = format!("{}{}", target.url.trim_end_matches('/'), path);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| e.to_string())?;
            let status = response.status().as_u16();
            let ok = if spec.expected_status.is_empty() {
                (200..300).contains(&status)
            } else {
                spec.expected_status.contains(&status)
            };
            if ok {
                Ok(())
            } else {
                Err(format!("unexpected status {status}"))
            }
        })
    }
}

/// Owns per-target health state and runs one periodic probe loop per target
/// with a health-check spec. Passive recording (from the upstream dispatch
/// loop) and active probing share the same state and thresholds.
pub struct HealthChecker {
    statuses: DashMap<String, HealthStatus>,
    transport: Arc<dyn HealthTransport>,
}

impl HealthChecker {
    pub fn new(transport: Arc<dyn HealthTransport>) -> Arc<Self> {
        Arc::new(HealthChecker {
            statuses: DashMap::new(),
            transport,
        })
    }

    pub fn status_of(&self, target_id: &str) -> Option<HealthStatus> {
        self.statuses.get(target_id).map(|r| r.clone())
    }

    fn apply_result(
        &self,
        target: &Target,
        spec: &HealthCheckSpec,
        success: bool,
        error: Option<String>,
        response_time: Option<Duration>,
    ) {
        let mut entry = self.statuses.entry(target.id.clone()).or_default();
        entry.last_check = Some(Instant::now());
        entry.last_response_time = response_time;
        if success {
            entry.consecutive_successes += 1;
            entry.consecutive_failures = 0;
            entry.last_error = None;
            if entry.consecutive_successes >= spec.healthy_threshold && !target.is_healthy() {
                info!("target '{}' recovered, marking healthy", target.id);
                target.set_healthy(true);
            }
        } else {
            entry.consecutive_failures += 1;
            entry.consecutive_successes = 0;
            entry.last_error = error;
            if entry.consecutive_failures >= spec.unhealthy_threshold && target.is_healthy() {
                warn!("target '{}' failing checks, marking unhealthy", target.id);
                target.set_healthy(false);
            }
        }
    }

    /// Passive recording from the upstream dispatch loop, sharing the same
    /// thresholds as active probing per the spec's resolution of that open
    /// question.
    pub fn record_request_result(
        &self,
        target: &Target,
        spec: &HealthCheckSpec,
        success: bool,
        error: Option<String>,
    ) {
        self.apply_result(target, spec, success, error, None);
    }

    /// Spawns the periodic active probe loop for one target. Cancellable by
    /// sending `true` on `shutdown`.
    pub fn spawn_probe_loop(
        self: &Arc<Self>,
        target: Arc<Target>,
        spec: HealthCheckSpec,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let checker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(spec.interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let start = Instant::now();
                        let probe = tokio::time::timeout(
                            Duration::from_millis(spec.timeout_ms),
                            checker.transport.probe(&target, &spec),
                        )
                        .await;
                        let elapsed = start.elapsed();
                        match probe {
                            Ok(Ok(())) => checker.apply_result(&target, &spec, true, None, Some(elapsed)),
                            Ok(Err(e)) => checker.apply_result(&target, &spec, false, Some(e), Some(elapsed)),
                            Err(_) => checker.apply_result(
                                &target,
                                &spec,
                                false,
                                Some("probe timed out".to_string()),
                                Some(elapsed),
                            ),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFail;
    impl HealthTransport for AlwaysFail {
        fn probe<'a>(
            &'a self,
            _target: &'a Target,
            _spec: &'a HealthCheckSpec,
        ) -> BoxFuture<'a, Result<(), String>> {
            Box::pin(async { Err("down".to_string()) })
        }
    }

    fn spec() -> HealthCheckSpec {
        HealthCheckSpec {
            interval_ms: 10,
            timeout_ms: 10,
            path: None,
            healthy_threshold: 2,
            unhealthy_threshold: 2,
            expected_status: vec![],
        }
    }

    #[test]
    fn flips_unhealthy_at_threshold_not_before() {
        let checker = HealthChecker::new(Arc::new(AlwaysFail));
        let target = Target::new("t1", "http://x", 1);
        let spec = spec();
        checker.record_request_result(&target, &spec, false, Some("e".into()));
        assert!(target.is_healthy());
        checker.record_request_result(&target, &spec, false, Some("e".into()));
        assert!(!target.is_healthy());
    }

    #[test]
    fn success_resets_failure_streak() {
        let checker = HealthChecker::new(Arc::new(AlwaysFail));
        let target = Target::new("t1", "http://x", 1);
        let spec = spec();
        checker.record_request_result(&target, &spec, false, None);
        checker.record_request_result(&target, &spec, true, None);
        let status = checker.status_of("t1").unwrap();
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn probe_loop_marks_target_unhealthy() {
        let checker = HealthChecker::new(Arc::new(AlwaysFail));
        let target = Target::new("t1", "http://x", 1);
        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = checker.spawn_probe_loop(target.clone(), spec(), rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!target.is_healthy());
        let _ = tx.send(true);
        let _ = handle.await;
    }
}
