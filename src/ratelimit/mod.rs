//! Four in-process rate-limiting algorithms plus an optional distributed
//! backing.
//!
//! Generalizes `middleware::rate_limit::RateLimitStore`, which already
//! implements fixed-window, sliding-window, and token-bucket against a
//! `RwLock<HashMap<String, RateLimitEntry>>` with a five-minute lazy-cleanup
//! idiom (kept here, sharded via `dashmap` instead of one global lock): adds
//! the fourth algorithm (adaptive) and the `{allowed, remaining, resetAt,
//! retryAfter}` response contract the teacher's boolean `check_rate_limit`
//! didn't return, plus a `RemoteLimiterBackend` trait seam for distributed
//! mode.

pub mod adaptive;
pub mod fixed_window;
pub mod limiter;
pub mod remote;
pub mod sliding_window;
pub mod token_bucket;

pub use limiter::{Decision, RateLimiter, RateLimiterConfig, Algorithm};
pub use remote::{InMemoryRemoteBackend, RemoteLimiterBackend};
