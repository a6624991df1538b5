//! The gateway's closed error taxonomy.
//!
//! Every failure that can reach a client boundary is one of the variants
//! below. Each carries the HTTP status it maps to and a stable string code
//! so a listener built on any web framework can translate it without
//! depending on this crate's internals.

use thiserror::Error;

/// Errors produced anywhere in the request plane.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("route {route_id} is disabled")]
    RouteDisabled { route_id: String },

    #[error("rate limit exceeded for key {key}")]
    RateLimited {
        key: String,
        retry_after_ms: u64,
    },

    #[error("authentication failed: {reason}")]
    AuthenticationFailure { reason: String },

    #[error("authorization failed: {reason}")]
    AuthorizationFailure { reason: String },

    #[error("request blocked by WAF rule {rule_id}")]
    WafBlocked { rule_id: String },

    #[error("circuit open for upstream {upstream_id}")]
    CircuitOpen { upstream_id: String },

    #[error("no healthy targets for upstream {upstream_id}")]
    NoHealthyTargets { upstream_id: String },

    #[error("upstream {upstream_id} failed: {message}")]
    UpstreamFailure { upstream_id: String, message: String },

    #[error("internal error: {0}")]
    InternalFailure(String),
}

impl GatewayError {
    /// HTTP status this error maps to on the wire.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::RouteNotFound { .. } => 404,
            GatewayError::RouteDisabled { .. } => 503,
            GatewayError::RateLimited { .. } => 429,
            GatewayError::AuthenticationFailure { .. } => 401,
            GatewayError::AuthorizationFailure { .. } => 403,
            GatewayError::WafBlocked { .. } => 403,
            GatewayError::CircuitOpen { .. } => 503,
            GatewayError::NoHealthyTargets { .. } => 503,
            GatewayError::UpstreamFailure { .. } => 502,
            GatewayError::InternalFailure(_) => 500,
        }
    }

    /// Stable machine-readable code for the error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            GatewayError::RouteDisabled { .. } => "ROUTE_DISABLED",
            GatewayError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            GatewayError::AuthenticationFailure { .. } => "AUTHENTICATION_FAILED",
            GatewayError::AuthorizationFailure { .. } => "AUTHORIZATION_FAILED",
            GatewayError::WafBlocked { .. } => "AUTHORIZATION_FAILED",
            GatewayError::CircuitOpen { .. } => "CIRCUIT_BREAKER_OPEN",
            GatewayError::NoHealthyTargets { .. } => "NO_HEALTHY_TARGETS",
            GatewayError::UpstreamFailure { .. } => "UPSTREAM_FAILED",
            GatewayError::InternalFailure(_) => "INTERNAL_ERROR",
        }
    }

    /// `Retry-After` header value in seconds, when applicable.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GatewayError::RateLimited { retry_after_ms, .. } => {
                Some((retry_after_ms + 999) / 1000)
            }
            _ => None,
        }
    }
}

/// JSON-serializable error body shape described by the wire protocol.
#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        ErrorBody {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
