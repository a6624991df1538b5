use super::context::{PluginContext, PluginOutcome};
use std::collections::HashMap;
use std::sync::Arc;

/// A plugin's executable logic, looked up by name at registration time —
/// never constructed dynamically per request.
pub trait PluginHandler: Send + Sync {
    fn handle(&self, ctx: &mut PluginContext, config: &serde_json::Value) -> PluginOutcome;
}

impl<F> PluginHandler for F
where
    F: Fn(&mut PluginContext, &serde_json::Value) -> PluginOutcome + Send + Sync,
{
    fn handle(&self, ctx: &mut PluginContext, config: &serde_json::Value) -> PluginOutcome {
        (self)(ctx, config)
    }
}

/// Resolves a plugin name to its handler.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    handlers: HashMap<String, Arc<dyn PluginHandler>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn PluginHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginHandler>> {
        self.handlers.get(name).cloned()
    }
}
