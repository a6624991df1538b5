use super::ring::ConsistentHashRing;
use crate::error::GatewayError;
use crate::models::upstream::{LoadBalancePolicy, Target, Upstream};
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Common contract every policy satisfies. `routing_key` is whatever the
/// caller considers stable for this request — the client address for
/// ip-hash, the request path for consistent-hash, ignored otherwise.
pub trait LoadBalancer: Send + Sync {
    fn select<'a>(
        &self,
        upstream_id: &str,
        healthy: &'a [Arc<Target>],
        routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError>;
}

fn no_healthy_targets(upstream_id: &str) -> GatewayError {
    GatewayError::NoHealthyTargets {
        upstream_id: upstream_id.to_string(),
    }
}

#[derive(Default)]
pub struct RoundRobinBalancer {
    counters: DashMap<String, AtomicUsize>,
}

impl LoadBalancer for RoundRobinBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        _routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        if healthy.is_empty() {
            return Err(no_healthy_targets(upstream_id));
        }
        let counter = self
            .counters
            .entry(upstream_id.to_string())
            .or_insert_with(|| AtomicUsize::new(0));
        let idx = counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Ok(healthy[idx].clone())
    }
}

#[derive(Default)]
pub struct WeightedRoundRobinBalancer {
    counters: DashMap<String, AtomicUsize>,
}

impl LoadBalancer for WeightedRoundRobinBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        _routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        if healthy.is_empty() {
            return Err(no_healthy_targets(upstream_id));
        }
        let total_weight: u32 = healthy.iter().map(|t| t.weight).sum();
        let counter = self
            .counters
            .entry(upstream_id.to_string())
            .or_insert_with(|| AtomicUsize::new(0));
        let tick = counter.fetch_add(1, Ordering::Relaxed) as u32 % total_weight.max(1);
        let mut accumulated = 0u32;
        for target in healthy {
            accumulated += target.weight;
            if tick < accumulated {
                return Ok(target.clone());
            }
        }
        Ok(healthy[0].clone())
    }
}

pub struct LeastConnectionsBalancer;

impl LoadBalancer for LeastConnectionsBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        _routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        healthy
            .iter()
            .min_by_key(|t| t.active_connections())
            .cloned()
            .ok_or_else(|| no_healthy_targets(upstream_id))
    }
}

pub struct IpHashBalancer;

impl LoadBalancer for IpHashBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        if healthy.is_empty() {
            return Err(no_healthy_targets(upstream_id));
        }
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        routing_key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % healthy.len();
        Ok(healthy[idx].clone())
    }
}

pub struct RandomBalancer;

impl LoadBalancer for RandomBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        _routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        if healthy.is_empty() {
            return Err(no_healthy_targets(upstream_id));
        }
        let idx = rand::thread_rng().gen_range(0..healthy.len());
        Ok(healthy[idx].clone())
    }
}

/// Rebuilds its ring whenever the healthy target set changes in identity
/// (by id set), otherwise reuses the cached ring — the rebuild is
/// idempotent for an unchanged target set, as the spec requires.
#[derive(Default)]
pub struct ConsistentHashBalancer {
    rings: DashMap<String, (Vec<String>, Arc<ConsistentHashRing>)>,
}

impl LoadBalancer for ConsistentHashBalancer {
    fn select(
        &self,
        upstream_id: &str,
        healthy: &[Arc<Target>],
        routing_key: &str,
    ) -> Result<Arc<Target>, GatewayError> {
        if healthy.is_empty() {
            return Err(no_healthy_targets(upstream_id));
        }
        let mut ids: Vec<String> = healthy.iter().map(|t| t.id.clone()).collect();
        ids.sort();

        let needs_rebuild = self
            .rings
            .get(upstream_id)
            .map(|entry| entry.0 != ids)
            .unwrap_or(true);

        if needs_rebuild {
            let ring = Arc::new(ConsistentHashRing::build(healthy));
            self.rings.insert(upstream_id.to_string(), (ids, ring));
        }

        let ring = self.rings.get(upstream_id).unwrap().1.clone();
        ring.select(routing_key).ok_or_else(|| no_healthy_targets(upstream_id))
    }
}

/// Resolves an upstream's configured policy to its balancer implementation,
/// mirroring `services::load_balancer::LoadBalancerFactory::create`.
pub struct LoadBalancerFactory;

impl LoadBalancerFactory {
    pub fn create(policy: LoadBalancePolicy) -> Arc<dyn LoadBalancer> {
        match policy {
            LoadBalancePolicy::RoundRobin => Arc::new(RoundRobinBalancer::default()),
            LoadBalancePolicy::WeightedRoundRobin => Arc::new(WeightedRoundRobinBalancer::default()),
            LoadBalancePolicy::LeastConnections => Arc::new(LeastConnectionsBalancer),
            LoadBalancePolicy::IpHash => Arc::new(IpHashBalancer),
            LoadBalancePolicy::Random => Arc::new(RandomBalancer),
            LoadBalancePolicy::ConsistentHash => Arc::new(ConsistentHashBalancer::default()),
        }
    }
}

/// Selects a healthy target from an upstream using its configured policy.
/// Returns `Err(NoHealthyTargets)` when none are healthy; shortcuts to the
/// sole target when exactly one is healthy (skipping policy bookkeeping),
/// matching the spec's stated behavior.
pub fn select_target(
    upstream: &Upstream,
    balancer: &dyn LoadBalancer,
    routing_key: &str,
) -> Result<Arc<Target>, GatewayError> {
    let healthy = upstream.healthy_targets();
    if healthy.is_empty() {
        return Err(no_healthy_targets(&upstream.id));
    }
    if healthy.len() == 1 {
        return Ok(healthy[0].clone());
    }
    balancer.select(&upstream.id, &healthy, routing_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(n: usize) -> Vec<Arc<Target>> {
        (0..n)
            .map(|i| Target::new(format!("t{i}"), format!("http://h{i}"), 1))
            .collect()
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let lb = RoundRobinBalancer::default();
        let ts = targets(2);
        let first = lb.select("up", &ts, "").unwrap();
        let second = lb.select("up", &ts, "").unwrap();
        let third = lb.select("up", &ts, "").unwrap();
        assert_eq!(first.id, "t0");
        assert_eq!(second.id, "t1");
        assert_eq!(third.id, "t0");
    }

    #[test]
    fn least_connections_prefers_idle_target() {
        let lb = LeastConnectionsBalancer;
        let ts = targets(2);
        ts[0].acquire_connection();
        ts[0].acquire_connection();
        let picked = lb.select("up", &ts, "").unwrap();
        assert_eq!(picked.id, "t1");
    }

    #[test]
    fn empty_target_list_fails_no_healthy() {
        let lb = RoundRobinBalancer::default();
        let err = lb.select("up", &[], "").unwrap_err();
        assert!(matches!(err, GatewayError::NoHealthyTargets { .. }));
    }
}
