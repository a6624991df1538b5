//! Observability: per-request metrics aggregation and the startup log
//! formatter, grounded in `src/logs/logger.rs`'s column-aligned ANSI
//! formatter and `src/logs/structured.rs`'s correlation-id-bearing entry
//! shape (simplified here to what a listener-agnostic core can produce
//! without an HTTP request object to pull headers from).

pub mod logger;
pub mod metrics;

pub use logger::configure_logger;
pub use metrics::{Recorder, RequestRecord, Snapshot};
