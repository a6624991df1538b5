use crate::util::HeaderMap;
use serde::{Deserialize, Serialize};

/// Ambient egress concern named in the External Interfaces surface: the core
/// computes which CORS headers a response should carry, even though the
/// listener embedding this crate owns the actual HTTP response write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_max_age() -> u64 {
    600
}

impl CorsSettings {
    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Builds the `Access-Control-Allow-*` headers for a given request
    /// origin, or `None` when the origin is not allowed.
    pub fn headers_for(&self, origin: &str) -> Option<HeaderMap> {
        if !self.origin_allowed(origin) {
            return None;
        }
        let mut headers = HeaderMap::new();
        let allow_origin = if self.allowed_origins.iter().any(|o| o == "*") {
            "*".to_string()
        } else {
            origin.to_string()
        };
        headers.set("access-control-allow-origin", allow_origin);
        if !self.allowed_methods.is_empty() {
            headers.set("access-control-allow-methods", self.allowed_methods.join(", "));
        }
        if !self.allowed_headers.is_empty() {
            headers.set("access-control-allow-headers", self.allowed_headers.join(", "));
        }
        if self.allow_credentials {
            headers.set("access-control-allow-credentials", "true");
        }
        headers.set("access-control-max-age", self.max_age_secs.to_string());
        Some(headers)
    }
}
