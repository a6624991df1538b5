use super::context::{PluginContext, PluginOutcome};
use super::registry::PluginRegistry;
use super::{Phase, PluginDescriptor};
use crate::error::GatewayError;
use log::{error, warn};

/// What running a phase produced.
pub enum PhaseResult {
    /// No plugin produced a response; continue to the next phase.
    Continued,
    /// A plugin produced a response; short-circuits remaining phases,
    /// except post-route still runs after a route-phase short-circuit.
    ShortCircuited,
    /// A plugin failed the request; diverts to the error phase.
    Failed(GatewayError),
}

/// A route's plugin descriptors, indexed by phase and sorted by descending
/// priority (stable on ties, so insertion order breaks ties — the ordering
/// `Vec::sort_by_key` on a negated priority already guarantees since the
/// sort is stable).
pub struct Pipeline {
    by_phase: Vec<(Phase, Vec<PluginDescriptor>)>,
}

impl Pipeline {
    pub fn build(plugins: &[PluginDescriptor]) -> Self {
        let phases = [Phase::PreRoute, Phase::Route, Phase::PostRoute, Phase::Error];
        let mut by_phase = Vec::new();
        for phase in phases {
            let mut in_phase: Vec<PluginDescriptor> = plugins
                .iter()
                .filter(|p| p.phase == phase && p.enabled)
                .cloned()
                .collect();
            in_phase.sort_by_key(|p| std::cmp::Reverse(p.priority));
            by_phase.push((phase, in_phase));
        }
        Pipeline { by_phase }
    }

    fn plugins_for(&self, phase: Phase) -> &[PluginDescriptor] {
        self.by_phase
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// Runs every enabled plugin declared for `phase`, in priority order.
    pub fn run_phase(
        &self,
        phase: Phase,
        ctx: &mut PluginContext,
        registry: &PluginRegistry,
    ) -> PhaseResult {
        for descriptor in self.plugins_for(phase) {
            let Some(handler) = registry.get(&descriptor.name) else {
                warn!("plugin '{}' not found in registry, skipping", descriptor.name);
                continue;
            };
            match handler.handle(ctx, &descriptor.config) {
                PluginOutcome::Continue => continue,
                PluginOutcome::ShortCircuit(response) => {
                    ctx.response = Some(response);
                    return PhaseResult::ShortCircuited;
                }
                PluginOutcome::Fail(err) => return PhaseResult::Failed(err),
            }
        }
        PhaseResult::Continued
    }

    /// Runs the error phase. Errors raised by error-phase plugins themselves
    /// are swallowed (logged) and the default error response is left to the
    /// caller to synthesize, per the spec's error-phase semantics.
    pub fn run_error_phase(&self, ctx: &mut PluginContext, registry: &PluginRegistry) {
        for descriptor in self.plugins_for(Phase::Error) {
            let Some(handler) = registry.get(&descriptor.name) else {
                continue;
            };
            match handler.handle(ctx, &descriptor.config) {
                PluginOutcome::Continue => continue,
                PluginOutcome::ShortCircuit(response) => {
                    ctx.response = Some(response);
                    return;
                }
                PluginOutcome::Fail(err) => {
                    error!("error-phase plugin '{}' itself failed: {err}", descriptor.name);
                    continue;
                }
            }
        }
    }
}
