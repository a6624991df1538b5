//! The configuration surface: a single deserializable [`Settings`]
//! aggregate, validated in one pass and loaded from a JSON file the way
//! `config::settings::load_settings` loads the teacher's.

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{load_settings, LoadError};
pub use settings::{CircuitBreakerSettings, IpFilterSettings, Settings, WafSettings};
pub use validation::{validate, ConfigError};
