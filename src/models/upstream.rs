use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The six selection policies the load balancer supports.
///
/// Generalizes `models::router::LoadBalancingStrategy` (round robin, least
/// connections, random, weighted, IP hash) by adding the consistent-hash
/// policy the teacher never implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancePolicy {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
    LeastConnections,
    IpHash,
    Random,
    ConsistentHash,
}

/// A single backend instance within an upstream.
///
/// `healthy` and `active_connections` are maintained by the health checker
/// and load balancer respectively, mirroring the teacher's
/// `LeastConnectionsBalancer`'s per-backend `AtomicU64` connection counters,
/// generalized onto the target itself so every policy can read it.
#[derive(Debug)]
pub struct Target {
    pub id: String,
    pub url: String,
    pub weight: u32,
    healthy: std::sync::atomic::AtomicBool,
    active_connections: AtomicU64,
}

impl Target {
    pub fn new(id: impl Into<String>, url: impl Into<String>, weight: u32) -> Arc<Self> {
        Arc::new(Target {
            id: id.into(),
            url: url.into(),
            weight: weight.max(1),
            healthy: std::sync::atomic::AtomicBool::new(true),
            active_connections: AtomicU64::new(0),
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Acquire)
    }

    pub fn acquire_connection(&self) {
        self.active_connections.fetch_add(1, Ordering::AcqRel);
    }

    pub fn release_connection(&self) {
        self.active_connections.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Deserializable configuration for a single target, before it becomes a
/// live [`Target`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub id: String,
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Retry budget and backoff, grounded in `models::router::RetryConfig` but
/// trimmed to what the spec's dispatch loop actually consumes: the backoff
/// formula itself is fixed by the engine (§4.9.1), this only carries the
/// budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_retries: 2 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    pub connect_ms: u64,
    pub send_ms: u64,
    pub read_ms: u64,
    pub overall_ms: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            connect_ms: 2_000,
            send_ms: 5_000,
            read_ms: 5_000,
            overall_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub path: Option<String>,
    #[serde(default = "default_healthy_threshold")]
    pub healthy_threshold: u32,
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,
    #[serde(default)]
    pub expected_status: Vec<u16>,
}

fn default_healthy_threshold() -> u32 {
    2
}
fn default_unhealthy_threshold() -> u32 {
    3
}

/// A named pool of backend targets sharing a load-balancing policy and
/// health policy.
pub struct Upstream {
    pub id: String,
    pub targets: Vec<Arc<Target>>,
    pub policy: LoadBalancePolicy,
    pub retry: RetryPolicy,
    pub timeout: TimeoutPolicy,
    pub health_check: Option<HealthCheckSpec>,
}

impl Upstream {
    pub fn healthy_targets(&self) -> Vec<Arc<Target>> {
        self.targets.iter().filter(|t| t.is_healthy()).cloned().collect()
    }
}

/// Deserializable configuration for an upstream, before its targets are
/// materialized into live [`Target`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub id: String,
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub policy: LoadBalancePolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub timeout: TimeoutPolicy,
    pub health_check: Option<HealthCheckSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamValidationError {
    #[error("upstream {id} must declare at least one target")]
    NoTargets { id: String },
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), UpstreamValidationError> {
        if self.targets.is_empty() {
            return Err(UpstreamValidationError::NoTargets { id: self.id.clone() });
        }
        Ok(())
    }

    pub fn into_upstream(self) -> Upstream {
        let targets = self
            .targets
            .into_iter()
            .map(|t| Target::new(t.id, t.url, t.weight))
            .collect();
        Upstream {
            id: self.id,
            targets,
            policy: self.policy,
            retry: self.retry,
            timeout: self.timeout,
            health_check: self.health_check,
        }
    }
}
