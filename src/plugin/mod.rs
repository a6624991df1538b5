//! The phase-ordered plugin pipeline.
//!
//! Redesigns the teacher's `middleware` module — two fixed Actix
//! `Transform`/`Service` stages (security headers, then validation, wired
//! around routing) — into a registry-resolved, per-route-configurable
//! four-phase chain. See the open question on plugin ABI in `DESIGN.md`:
//! plugins are named descriptors resolved through a [`PluginRegistry`], not
//! executable closures embedded in route config.

pub mod context;
pub mod pipeline;
pub mod registry;

pub use context::{PluginContext, PluginOutcome};
pub use pipeline::{PhaseResult, Pipeline};
pub use registry::{PluginHandler, PluginRegistry};

use serde::{Deserialize, Serialize};

/// The four fixed pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreRoute,
    Route,
    PostRoute,
    Error,
}

/// A route's declaration of one plugin instance: which named handler to
/// run, in which phase, at what priority, with what configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub phase: Phase,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_true() -> bool {
    true
}
