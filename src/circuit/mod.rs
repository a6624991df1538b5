//! The per-upstream circuit breaker state machine.
//!
//! Redesigns `services::circuit_breaker::CircuitBreaker`, which opens after
//! N *consecutive* failures, into the spec's volume-threshold +
//! failure-fraction model: the breaker never opens before `volume_threshold`
//! requests have been observed since the last CLOSED entry, and then only
//! if `failures / total >= failure_threshold`. Kept the teacher's
//! atomic-state-tag-plus-locked-timing-field shape and its `call()` wrapper
//! idiom, and its `CircuitState`/`CircuitBreakerError` naming.

pub mod breaker;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState, CircuitStatistics};
