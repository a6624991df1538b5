use super::transport::UpstreamTransport;
use crate::balancer::LoadBalancer;
use crate::circuit::CircuitBreaker;
use crate::error::GatewayError;
use crate::health::HealthChecker;
use crate::models::request::GatewayRequest;
use crate::models::response::GatewayResponse;
use crate::models::upstream::{LoadBalancePolicy, Upstream};
use log::warn;
use std::time::{Duration, Instant};

fn routing_key_for<'a>(policy: LoadBalancePolicy, request: &'a GatewayRequest) -> &'a str {
    match policy {
        LoadBalancePolicy::IpHash => &request.client_addr,
        _ => &request.path,
    }
}

/// Implements the retry/circuit-breaker/load-balancer orchestration loop
/// generalized from `services::http::RouteHandler::handle_request_internal`,
/// with the spec's fixed `100 * 2^(attempt-1)` ms backoff (§4.9.1) in place
/// of the teacher's configurable `RetryConfig::calculate_backoff`.
pub async fn dispatch(
    upstream: &Upstream,
    balancer: &dyn LoadBalancer,
    circuit_breaker: &CircuitBreaker,
    health_checker: &HealthChecker,
    transport: &dyn UpstreamTransport,
    request: &GatewayRequest,
) -> Result<GatewayResponse, GatewayError> {
    let max_attempts = upstream.retry.max_retries + 1;
    let routing_key = routing_key_for(upstream.policy, request);
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if !circuit_breaker.can_execute(Instant::now()) {
            return Err(GatewayError::CircuitOpen {
                upstream_id: upstream.id.clone(),
            });
        }

        let target = crate::balancer::strategies::select_target(upstream, balancer, routing_key)?;
        target.acquire_connection();
        let send_result = transport
            .send(&target, request, Duration::from_millis(upstream.timeout.overall_ms))
            .await;
        target.release_connection();

        match send_result {
            Ok(response) => {
                circuit_breaker.on_success(Instant::now());
                if let Some(spec) = &upstream.health_check {
                    health_checker.record_request_result(&target, spec, true, None);
                }
                return Ok(response);
            }
            Err(err) => {
                circuit_breaker.on_failure(Instant::now());
                if let Some(spec) = &upstream.health_check {
                    health_checker.record_request_result(&target, spec, false, Some(err.clone()));
                }
                warn!(
                    "upstream '{}' attempt {} via target '{}' failed: {err}",
                    upstream.id, attempt + 1, target.id
                );
                last_error = err;
                if attempt + 1 < max_attempts {
                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    Err(GatewayError::UpstreamFailure {
        upstream_id: upstream.id.clone(),
        message: last_error,
    })
}
