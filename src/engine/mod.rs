//! The gateway engine: orchestrates the plugin pipeline, load balancer,
//! circuit breaker, and upstream dispatch for each request.
//!
//! Generalizes `services::http::RouteHandler::handle_request_internal`,
//! which already implements the retry loop (per-backend circuit breaker
//! lookup, exponential backoff, load-balancer success/failure bookkeeping),
//! into the full pipeline this spec describes, and abstracts the raw
//! `reqwest` send behind [`transport::UpstreamTransport`] so the engine has
//! no hard dependency on a concrete HTTP client.

pub mod gateway;
pub mod transport;
pub mod upstream_dispatch;

pub use gateway::GatewayEngine;
pub use transport::{ReqwestTransport, UpstreamTransport};
