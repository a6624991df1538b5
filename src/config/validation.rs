use super::settings::Settings;
use std::collections::HashSet;

/// Walks every sub-config in the same order the teacher's `Settings::validate`
/// walks JWT then routers, collecting the first failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported config schema version {0}")]
    UnsupportedVersion(u8),
    #[error("no upstreams configured")]
    NoUpstreams,
    #[error("no routes configured")]
    NoRoutes,
    #[error("upstream config invalid: {0}")]
    Upstream(#[from] crate::models::upstream::UpstreamValidationError),
    #[error("route config invalid: {0}")]
    Route(#[from] crate::models::route::RouteValidationError),
    #[error("route {route_id} references unknown upstream {upstream_id}")]
    DanglingUpstreamRef { route_id: String, upstream_id: String },
    #[error("rate limit threshold fraction must be in (0, 1], got {0}")]
    InvalidFailureFraction(f64),
}

pub const SUPPORTED_VERSION: u8 = 1;

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != SUPPORTED_VERSION {
        return Err(ConfigError::UnsupportedVersion(settings.version));
    }
    if settings.upstreams.is_empty() {
        return Err(ConfigError::NoUpstreams);
    }
    if settings.routes.is_empty() {
        return Err(ConfigError::NoRoutes);
    }
    if !(0.0..=1.0).contains(&settings.circuit_breaker.failure_threshold_fraction)
        || settings.circuit_breaker.failure_threshold_fraction <= 0.0
    {
        return Err(ConfigError::InvalidFailureFraction(
            settings.circuit_breaker.failure_threshold_fraction,
        ));
    }

    for upstream in &settings.upstreams {
        upstream.validate()?;
    }

    let upstream_ids: HashSet<&str> = settings.upstreams.iter().map(|u| u.id.as_str()).collect();
    for route in &settings.routes {
        route.validate()?;
        if !upstream_ids.contains(route.upstream_id.as_str()) {
            return Err(ConfigError::DanglingUpstreamRef {
                route_id: route.id.clone(),
                upstream_id: route.upstream_id.clone(),
            });
        }
    }

    Ok(())
}
