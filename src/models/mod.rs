//! The data model underlying every component: requests, responses, routes,
//! upstreams, targets, and consumers.
//!
//! Generalizes `models::router::Router`'s `host`/`port`/`backends` duality
//! into an explicit [`Upstream`]/[`Target`] split, and `models::settings`'s
//! top-level aggregate into [`route::Route`]/[`upstream::Upstream`] pairs
//! that the route table and load balancer consume directly.

pub mod consumer;
pub mod request;
pub mod response;
pub mod route;
pub mod upstream;

pub use consumer::Consumer;
pub use request::GatewayRequest;
pub use response::GatewayResponse;
pub use route::{MatchMode, Route};
pub use upstream::{LoadBalancePolicy, Target, Upstream};
