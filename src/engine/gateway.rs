use super::transport::UpstreamTransport;
use super::upstream_dispatch;
use crate::admission::{
    sanitize_body, sanitize_headers, sanitize_path, ApiKeyValidator, CorsSettings, IpFilter,
    JwtValidator, OAuth2Check, Waf, WafAction,
};
use crate::balancer::{LoadBalancer, LoadBalancerFactory};
use crate::circuit::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::GatewayError;
use crate::health::{HealthChecker, HealthTransport};
use crate::models::request::GatewayRequest;
use crate::models::response::GatewayResponse;
use crate::models::route::Route;
use crate::models::upstream::Upstream;
use crate::observability::{RequestRecord, Recorder};
use crate::plugin::{Phase, PhaseResult, Pipeline, PluginContext, PluginRegistry};
use crate::ratelimit::RateLimiter;
use crate::routing::RouteResolver;
use dashmap::DashMap;
use log::error;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::watch;

/// Everything needed to serve a request, minus the concrete listener.
/// Owns the route table (whole-value swap behind `RwLock`) and the
/// per-upstream/per-entity sharded state the spec's concurrency model (§5)
/// calls for. Generalizes `services::http::RouteHandler`'s constructor,
/// which built one circuit breaker per service key and one load balancer
/// per multi-backend route.
pub struct GatewayEngine {
    route_resolver: RwLock<Arc<RouteResolver>>,
    upstreams: DashMap<String, Arc<Upstream>>,
    balancers: DashMap<String, Arc<dyn LoadBalancer>>,
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,
    health_checker: Arc<HealthChecker>,
    cache: Option<Arc<crate::cache::ResponseCache>>,
    rate_limiters: DashMap<String, Arc<RateLimiter>>,
    ip_filter: Option<Arc<IpFilter>>,
    waf: Option<Arc<Waf>>,
    jwt: Option<Arc<JwtValidator>>,
    api_key: Option<Arc<ApiKeyValidator>>,
    oauth2: Option<Arc<dyn OAuth2Check>>,
    cors: Option<Arc<CorsSettings>>,
    plugin_registry: Arc<PluginRegistry>,
    transport: Arc<dyn UpstreamTransport>,
    recorder: Option<Arc<Recorder>>,
    health_shutdown: DashMap<String, watch::Sender<bool>>,
}

impl GatewayEngine {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        health_transport: Arc<dyn HealthTransport>,
        plugin_registry: Arc<PluginRegistry>,
    ) -> Self {
        GatewayEngine {
            route_resolver: RwLock::new(Arc::new(RouteResolver::build(vec![]).expect("empty route set is always valid"))),
            upstreams: DashMap::new(),
            balancers: DashMap::new(),
            circuit_breakers: DashMap::new(),
            health_checker: HealthChecker::new(health_transport),
            cache: None,
            rate_limiters: DashMap::new(),
            ip_filter: None,
            waf: None,
            jwt: None,
            api_key: None,
            oauth2: None,
            cors: None,
            plugin_registry,
            transport,
            recorder: None,
            health_shutdown: DashMap::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<crate::cache::ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_ip_filter(mut self, filter: Arc<IpFilter>) -> Self {
        self.ip_filter = Some(filter);
        self
    }

    pub fn with_waf(mut self, waf: Arc<Waf>) -> Self {
        self.waf = Some(waf);
        self
    }

    pub fn with_jwt(mut self, jwt: Arc<JwtValidator>) -> Self {
        self.jwt = Some(jwt);
        self
    }

    pub fn with_api_key(mut self, validator: Arc<ApiKeyValidator>) -> Self {
        self.api_key = Some(validator);
        self
    }

    pub fn with_oauth2(mut self, validator: Arc<dyn OAuth2Check>) -> Self {
        self.oauth2 = Some(validator);
        self
    }

    pub fn with_cors(mut self, cors: Arc<CorsSettings>) -> Self {
        self.cors = Some(cors);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Whole-value swap of the route table; readers never observe a
    /// partial update.
    pub fn set_routes(&self, routes: Vec<Route>) -> Result<(), crate::routing::RouteResolverError> {
        let resolver = Arc::new(RouteResolver::build(routes)?);
        *self.route_resolver.write().unwrap() = resolver;
        Ok(())
    }

    /// Registers an upstream and, if it carries a health-check spec, starts
    /// one active probe loop per target (§4.4/§5's "background loops" are
    /// the engine's responsibility, not the caller's).
    pub fn register_upstream(&self, upstream: Upstream) {
        let id = upstream.id.clone();
        let balancer = LoadBalancerFactory::create(upstream.policy);
        let breaker = CircuitBreaker::new(id.clone(), CircuitBreakerConfig::default());
        if let Some(spec) = &upstream.health_check {
            for target in &upstream.targets {
                let (tx, rx) = watch::channel(false);
                self.health_checker.spawn_probe_loop(target.clone(), spec.clone(), rx);
                self.health_shutdown.insert(target.id.clone(), tx);
            }
        }
        self.upstreams.insert(id.clone(), Arc::new(upstream));
        self.balancers.insert(id.clone(), balancer);
        self.circuit_breakers.insert(id, breaker);
    }

    /// Signals every active probe loop started for `upstream_id`'s targets
    /// to stop. Targets themselves are not removed from the resolver.
    pub fn stop_health_probes(&self, upstream_id: &str) {
        if let Some(upstream) = self.upstreams.get(upstream_id) {
            for target in &upstream.targets {
                if let Some((_, tx)) = self.health_shutdown.remove(&target.id) {
                    let _ = tx.send(true);
                }
            }
        }
    }

    pub fn register_rate_limiter(&self, key: impl Into<String>, limiter: RateLimiter) {
        self.rate_limiters.insert(key.into(), Arc::new(limiter));
    }

    /// Tries every configured authentication mechanism in turn — JWT, then
    /// API key, then OAuth2 — and accepts the request as soon as one
    /// succeeds, matching how a gateway typically offers several acceptable
    /// credential schemes rather than requiring all of them at once.
    async fn authenticate(&self, request: &GatewayRequest) -> Result<(), GatewayError> {
        let query: HashMap<String, String> = request
            .query
            .iter()
            .map(|(k, v)| (k.clone(), v.first().to_string()))
            .collect();

        let mut last_reason = String::new();

        if let Some(jwt) = &self.jwt {
            match jwt.validate(&request.headers, &query) {
                Ok(_) => return Ok(()),
                Err(e) => last_reason = e.to_string(),
            }
        }
        if let Some(api_key) = &self.api_key {
            match api_key.validate(&request.headers, &query, None, chrono::Utc::now()) {
                Ok(_) => return Ok(()),
                Err(e) => last_reason = e.to_string(),
            }
        }
        if let Some(oauth2) = &self.oauth2 {
            match oauth2.check(&request.headers, None).await {
                Ok(_) => return Ok(()),
                Err(e) => last_reason = e.to_string(),
            }
        }

        Err(GatewayError::AuthenticationFailure { reason: last_reason })
    }

    fn error_response(err: &GatewayError) -> GatewayResponse {
        let body = serde_json::to_vec(&crate::error::ErrorBody::from(err)).unwrap_or_default();
        let mut response = GatewayResponse::new(err.status_code(), body);
        response.headers.set("content-type", "application/json");
        if let Some(retry_after) = err.retry_after_secs() {
            response.headers.set("retry-after", retry_after.to_string());
        }
        response
    }

    /// Runs the full request lifecycle: sanitize, resolve, admission,
    /// cache, pipeline, dispatch, observability — matching the data flow
    /// in §2 and the orchestration steps in §4.9.
    pub async fn process(&self, mut request: GatewayRequest) -> GatewayResponse {
        let started = Instant::now();
        request.path = sanitize_path(&request.path);
        request.headers = sanitize_headers(&request.headers);
        if let Ok(text) = std::str::from_utf8(&request.body) {
            let cleaned = sanitize_body(text);
            if cleaned.len() != text.len() {
                request.body = cleaned.into_bytes();
            }
        }

        let result = self.process_inner(&mut request).await;
        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                error!("request {} failed: {err}", request.id);
                Self::error_response(&err)
            }
        };
        response.duration = started.elapsed();

        if let Some(cors) = &self.cors {
            if let Some(origin) = request.headers.get("origin") {
                if let Some(cors_headers) = cors.headers_for(origin) {
                    for (name, value) in cors_headers.iter() {
                        response.headers.set(name, value.to_string());
                    }
                }
            }
        }

        if let Some(recorder) = &self.recorder {
            recorder.record(RequestRecord {
                route_id: None,
                consumer_id: request.consumer_id.clone(),
                method: request.method.to_string(),
                path: request.path.clone(),
                status: response.status,
                duration: response.duration,
                upstream_id: response.upstream_id.clone(),
                cached: response.cached,
                rate_limited: response.status == 429,
                arrived_at: request.arrived_at,
            });
        }
        response
    }

    async fn process_inner(&self, request: &mut GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let resolver = self.route_resolver.read().unwrap().clone();
        let route = resolver
            .resolve(request.method, &request.path)
            .cloned()
            .ok_or_else(|| GatewayError::RouteNotFound {
                method: request.method.to_string(),
                path: request.path.clone(),
            })?;

        if !route.enabled {
            return Err(GatewayError::RouteDisabled { route_id: route.id.clone() });
        }

        if let Some(filter) = &self.ip_filter {
            if !filter.is_allowed(&request.client_addr) {
                return Err(GatewayError::AuthorizationFailure {
                    reason: "client address denied by IP filter".to_string(),
                });
            }
        }

        if let Some(waf) = &self.waf {
            let query_values: Vec<&str> = request.query.values().map(|v| v.first()).collect();
            let header_values: Vec<&str> = request.headers.iter().map(|(_, v)| v).collect();
            let body = String::from_utf8_lossy(&request.body);
            let (matches, action) = waf.analyze(&request.path, &query_values, &header_values, &body);
            if action == Some(WafAction::Block) {
                let rule_id = matches.first().map(|m| m.rule_id.clone()).unwrap_or_default();
                return Err(GatewayError::WafBlocked { rule_id });
            }
        }

        if self.jwt.is_some() || self.api_key.is_some() || self.oauth2.is_some() {
            self.authenticate(request).await?;
        }

        if let Some(limiter) = self.rate_limiters.get(&route.id) {
            let key = format!("{}:{}", route.id, request.client_addr);
            let decision = limiter.consume(&key);
            if !decision.allowed {
                return Err(GatewayError::RateLimited {
                    key,
                    retry_after_ms: decision.retry_after_ms.unwrap_or(0),
                });
            }
        }

        if let Some(cache) = &self.cache {
            let fingerprint = crate::cache::fingerprint(
                &request.method.to_string(),
                &request.path,
                &[],
                &[],
            );
            if let Some(cached) = cache.get(&fingerprint) {
                return Ok(cached);
            }
        }

        let pipeline = Pipeline::build(&route.plugins);
        let mut ctx = PluginContext::new(request.clone(), route.clone());

        match pipeline.run_phase(Phase::PreRoute, &mut ctx, &self.plugin_registry) {
            PhaseResult::Failed(err) => return self.run_error_phase(&pipeline, &mut ctx, err),
            PhaseResult::ShortCircuited => {
                return self.finish_post_route(&pipeline, &mut ctx);
            }
            PhaseResult::Continued => {}
        }

        match pipeline.run_phase(Phase::Route, &mut ctx, &self.plugin_registry) {
            PhaseResult::Failed(err) => return self.run_error_phase(&pipeline, &mut ctx, err),
            PhaseResult::ShortCircuited => {}
            PhaseResult::Continued => {
                let dispatched = self.dispatch(&ctx.route, request).await;
                match dispatched {
                    Ok(response) => ctx.response = Some(response),
                    Err(err) => return self.run_error_phase(&pipeline, &mut ctx, err),
                }
            }
        }

        self.finish_post_route(&pipeline, &mut ctx)
    }

    fn finish_post_route(
        &self,
        pipeline: &Pipeline,
        ctx: &mut PluginContext,
    ) -> Result<GatewayResponse, GatewayError> {
        match pipeline.run_phase(Phase::PostRoute, ctx, &self.plugin_registry) {
            PhaseResult::Failed(err) => self.run_error_phase(pipeline, ctx, err),
            _ => ctx
                .response
                .take()
                .ok_or_else(|| GatewayError::InternalFailure("no response produced".to_string())),
        }
    }

    fn run_error_phase(
        &self,
        pipeline: &Pipeline,
        ctx: &mut PluginContext,
        err: GatewayError,
    ) -> Result<GatewayResponse, GatewayError> {
        ctx.error = Some(err);
        pipeline.run_error_phase(ctx, &self.plugin_registry);
        match ctx.response.take() {
            Some(response) => Ok(response),
            None => Err(ctx.error.take().unwrap()),
        }
    }

    async fn dispatch(&self, route: &Route, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        let upstream = self
            .upstreams
            .get(&route.upstream_id)
            .map(|e| e.clone())
            .ok_or_else(|| GatewayError::InternalFailure(format!("unknown upstream {}", route.upstream_id)))?;
        let balancer = self.balancers.get(&route.upstream_id).map(|e| e.clone()).unwrap();
        let breaker = self.circuit_breakers.get(&route.upstream_id).map(|e| e.clone()).unwrap();

        upstream_dispatch::dispatch(
            &upstream,
            balancer.as_ref(),
            &breaker,
            &self.health_checker,
            self.transport.as_ref(),
            request,
        )
        .await
    }
}
