//! A keyed response cache with LRU, LFU, and time-based eviction.
//!
//! New component — the teacher has no response cache. Generalizes
//! `middleware::rate_limit::RateLimitStore`'s sharded, lazily-expiring
//! keyed-store shape (here via `dashmap` instead of one global `RwLock`)
//! and `LeastConnectionsBalancer`'s `AtomicU64`-per-key counters for hit
//! bookkeeping, onto entries that also track size and recency for three
//! eviction policies.

pub mod fingerprint;
pub mod store;

pub use fingerprint::fingerprint;
pub use store::{CacheConfig, EvictionPolicy, ResponseCache};
