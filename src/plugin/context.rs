use crate::error::GatewayError;
use crate::models::{Consumer, GatewayRequest, GatewayResponse, Route};
use std::collections::HashMap;

/// Mutable scratch state threaded through every plugin in a request's
/// pipeline run, plus the pieces of the request each phase may need.
pub struct PluginContext {
    pub request: GatewayRequest,
    pub route: Route,
    pub consumer: Option<Consumer>,
    pub response: Option<GatewayResponse>,
    pub error: Option<GatewayError>,
    pub scratch: HashMap<String, serde_json::Value>,
}

impl PluginContext {
    pub fn new(request: GatewayRequest, route: Route) -> Self {
        PluginContext {
            request,
            route,
            consumer: None,
            response: None,
            error: None,
            scratch: HashMap::new(),
        }
    }
}

/// What a plugin did to the context.
pub enum PluginOutcome {
    /// Let the remaining plugins in this phase (and subsequent phases) run.
    Continue,
    /// Produce a response and short-circuit the rest of the pipeline.
    ShortCircuit(GatewayResponse),
    /// Fail the request; diverts to the error phase.
    Fail(GatewayError),
}
