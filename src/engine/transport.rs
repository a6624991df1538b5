use crate::models::{GatewayRequest, GatewayResponse, Target};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// The single "send to target" contract the spec requires, so a concrete
/// network implementation can be slotted in without the engine depending on
/// it directly. [`ReqwestTransport`] is the real implementation; tests use
/// a stub.
pub trait UpstreamTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        target: &'a Target,
        request: &'a GatewayRequest,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<GatewayResponse, String>>;
}

/// Grounded in `services::http::RouteHandler`'s `reqwest::Client` setup
/// (pooled idle connections, 32 per host) and `build_headers_optimized`'s
/// header filtering, generalized through [`crate::util::HeaderMap`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .build()
            .expect("reqwest client builds with default TLS backend");
        ReqwestTransport { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamTransport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        target: &'a Target,
        request: &'a GatewayRequest,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<GatewayResponse, String>> {
        Box::pin(async move {
            let url = format!("{}{}", target.url.trim_end_matches('/'), request.path);
            let method = reqwest::Method::from_bytes(request.method.to_string().as_bytes())
                .map_err(|e| e.to_string())?;

            let mut builder = self.client.request(method, &url).timeout(timeout);
            let mut forwarded = request.headers.strip_hop_by_hop();
            let proto = if target.url.starts_with("https") { "https" } else { "http" };
            let host = forwarded
                .get("host")
                .map(|h| h.to_string())
                .unwrap_or_else(|| target.url.clone());
            forwarded.apply_forwarding(&request.id, &request.client_addr, proto, &host);
            for (name, value) in forwarded.iter() {
                builder = builder.header(name, value);
            }
            builder = builder.body(request.body.clone());

            let start = std::time::Instant::now();
            let response = builder.send().await.map_err(|e| e.to_string())?;
            let status = response.status().as_u16();
            let mut headers = crate::util::HeaderMap::new();
            for (name, value) in response.headers().iter() {
                if let Ok(v) = value.to_str() {
                    headers.insert(name.as_str(), v.to_string());
                }
            }
            let body = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

            Ok(GatewayResponse {
                status,
                headers,
                body,
                duration: start.elapsed(),
                upstream_id: Some(target.id.clone()),
                cached: false,
            })
        })
    }
}

pub fn reqwest_transport() -> Arc<dyn UpstreamTransport> {
    Arc::new(ReqwestTransport::new())
}
