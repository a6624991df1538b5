use crate::util::HeaderMap;
use std::time::Duration;

/// A response, either from an upstream, the cache, or a synthesized error.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub duration: Duration,
    pub upstream_id: Option<String>,
    pub cached: bool,
}

impl GatewayResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        GatewayResponse {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            duration: Duration::ZERO,
            upstream_id: None,
            cached: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}
