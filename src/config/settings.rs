use crate::admission::api_key::ApiKeyConfigEntry;
use crate::admission::{CorsSettings, IpFilterMode, JwtConfig, OAuth2Settings, WafRule};
use crate::cache::CacheConfig;
use crate::circuit::CircuitBreakerConfig;
use crate::models::route::Route;
use crate::models::upstream::UpstreamConfig;
use crate::ratelimit::RateLimiterConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serde-friendly mirror of [`CircuitBreakerConfig`] (which carries a
/// `Duration` the wire format expresses in milliseconds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u32,
    #[serde(default = "default_failure_fraction")]
    pub failure_threshold_fraction: f64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
}

fn default_volume_threshold() -> u32 {
    10
}
fn default_failure_fraction() -> f64 {
    0.5
}
fn default_success_threshold() -> u32 {
    2
}
fn default_open_timeout_ms() -> u64 {
    30_000
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        CircuitBreakerSettings {
            volume_threshold: default_volume_threshold(),
            failure_threshold_fraction: default_failure_fraction(),
            success_threshold: default_success_threshold(),
            open_timeout_ms: default_open_timeout_ms(),
        }
    }
}

impl From<CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(settings: CircuitBreakerSettings) -> Self {
        CircuitBreakerConfig {
            volume_threshold: settings.volume_threshold,
            failure_threshold_fraction: settings.failure_threshold_fraction,
            success_threshold: settings.success_threshold,
            timeout: Duration::from_millis(settings.open_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpFilterSettings {
    pub mode: IpFilterMode,
    pub cidrs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WafSettings {
    #[serde(default)]
    pub rules: Vec<WafRule>,
}

/// Root configuration object, following `models::settings::Settings`'s
/// shape: a thin, fully-deserializable aggregate of every component's
/// config, with everything past `version`/`upstreams`/`routes` optional and
/// defaulted so a minimal gateway needs only a route table and an upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub version: u8,
    pub upstreams: Vec<UpstreamConfig>,
    pub routes: Vec<Route>,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub ip_filter: Option<IpFilterSettings>,
    #[serde(default)]
    pub waf: Option<WafSettings>,
    #[serde(default)]
    pub jwt: Option<JwtConfig>,
    #[serde(default)]
    pub api_keys: Option<Vec<ApiKeyConfigEntry>>,
    #[serde(default)]
    pub oauth2: Option<OAuth2Settings>,
    #[serde(default)]
    pub cors: Option<CorsSettings>,
    #[serde(default)]
    pub worker_count: Option<usize>,
}
