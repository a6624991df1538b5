//! Active probing plus passive failure recording, sharing thresholds and
//! state per the spec's resolution of the open question on that point (see
//! `DESIGN.md`).
//!
//! New functionality — the teacher only declared a `Backend::health_check_path`
//! field and never wired a checker to it. Seeded from that field plus the
//! healthy/ready/alive vocabulary in `routes::health`'s three handlers, and
//! from the periodic-timer idiom the teacher uses for its connection-pool
//! idle timeout.

pub mod checker;

pub use checker::{HealthChecker, HealthStatus, HealthTransport};
