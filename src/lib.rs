//! # kairos-gateway-core
//!
//! The request-plane core of an API gateway: everything between "a request
//! arrived" and "a response is ready to write back", with no concrete
//! network listener baked in. Embed this crate behind whatever HTTP server
//! you like — the [`engine::transport::UpstreamTransport`] and
//! [`health::HealthTransport`] traits are the only two places this crate
//! reaches the network, and both ship with a `reqwest`-based default.
//!
//! ## Quick start
//!
//! ```no_run
//! use kairos_gateway_core::config::load_settings;
//! use kairos_gateway_core::engine::GatewayEngine;
//! use kairos_gateway_core::engine::transport::reqwest_transport;
//! use kairos_gateway_core::health::checker::ReqwestHealthTransport;
//! use kairos_gateway_core::plugin::PluginRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = load_settings()?;
//!
//! let engine = GatewayEngine::new(
//!     reqwest_transport(),
//!     Arc::new(ReqwestHealthTransport::new()),
//!     Arc::new(PluginRegistry::new()),
//! );
//! for upstream in settings.upstreams {
//!     engine.register_upstream(upstream.into_upstream());
//! }
//! engine.set_routes(settings.routes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`error`] — the closed [`error::GatewayError`] taxonomy every
//!   component's failures resolve to, with HTTP status and stable error
//!   code mappings.
//! - [`models`] — requests, responses, routes, upstreams, targets, consumers.
//! - [`config`] — the [`config::Settings`] aggregate, validation, and a
//!   file-system loader.
//! - [`routing`] — the three-tier (exact/prefix/regex) route resolver.
//! - [`balancer`] — six load-balancing policies, including consistent hashing.
//! - [`circuit`] — the volume+failure-fraction circuit breaker.
//! - [`health`] — active probing and passive request-outcome health tracking.
//! - [`ratelimit`] — token-bucket, sliding-window, fixed-window, and adaptive
//!   rate limiting, plus a pluggable distributed backend.
//! - [`cache`] — a keyed response cache with LRU/LFU/time-based eviction.
//! - [`admission`] — IP filter, WAF, API key, JWT, OAuth2, sanitizer, CORS.
//! - [`plugin`] — the phase-ordered (pre-route/route/post-route/error)
//!   plugin pipeline.
//! - [`engine`] — the [`engine::GatewayEngine`] orchestrator tying every
//!   component together, plus the upstream dispatch retry loop.
//! - [`observability`] — request metrics aggregation and the log formatter.
//! - [`util`] — the clock abstraction and a case-insensitive header multimap.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────┐   ┌──────────────────────────────────────────────┐   ┌──────────┐
//! │ Client │──▶│               GatewayEngine                  │──▶│ Upstream │
//! │        │   │  sanitize → resolve → admission → cache       │   │ Targets  │
//! │        │   │  → plugin pipeline → dispatch (LB + breaker)  │   │          │
//! └────────┘   └──────────────────────────────────────────────┘   └──────────┘
//! ```
//!
//! ## Configuration
//!
//! Configuration is a single JSON document deserialized into
//! [`config::Settings`]; see that module for the full shape. The file path
//! is `KAIROS_GATEWAY_CONFIG_PATH` (default `./config.json`).
//!
//! ## Environment variables
//!
//! - `KAIROS_GATEWAY_CONFIG_PATH` — configuration file path.
//! - `KAIROS_GATEWAY_LOG_LEVEL` — log level filter (default `info`).
//! - `NO_COLOR` — disable colored log output.
//!
//! ## Non-goals
//!
//! This crate does not bind a socket, terminate TLS, or spawn worker
//! threads — those are the embedding listener's job. It also does not
//! implement gRPC/WebSocket proxying, a plugin scripting VM, or an admin UI;
//! see `DESIGN.md` for the full list and rationale.

pub mod admission;
pub mod balancer;
pub mod cache;
pub mod circuit;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod plugin;
pub mod ratelimit;
pub mod routing;
pub mod util;
