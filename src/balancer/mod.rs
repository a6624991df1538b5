//! Target selection under six load-balancing policies.
//!
//! Generalizes `services::load_balancer`'s `LoadBalancer` trait and its five
//! strategy structs (`RoundRobinBalancer`, `WeightedBalancer`,
//! `LeastConnectionsBalancer`, `IpHashBalancer`, `RandomBalancer`) plus its
//! `LoadBalancerFactory`, adding the sixth strategy — consistent hashing —
//! which the teacher never implemented.

pub mod ring;
pub mod strategies;

pub use ring::ConsistentHashRing;
pub use strategies::{LoadBalancer, LoadBalancerFactory};
