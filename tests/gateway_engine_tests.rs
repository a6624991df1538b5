//! End-to-end scenarios against `GatewayEngine`, exercising routing, load
//! balancing, circuit breaking, rate limiting, and the WAF through the
//! public `process` entry point rather than each component in isolation.

use futures::future::BoxFuture;
use kairos_gateway_core::admission::{
    ApiKeyRecord, ApiKeyValidator, CorsSettings, IpFilter, IpFilterMode, JwtConfig, JwtValidator,
    OAuth2Validator, TokenInfo, TokenIntrospector, Waf,
};
use kairos_gateway_core::engine::transport::UpstreamTransport;
use kairos_gateway_core::engine::GatewayEngine;
use kairos_gateway_core::health::checker::ReqwestHealthTransport;
use kairos_gateway_core::models::request::{GatewayRequest, Method};
use kairos_gateway_core::models::response::GatewayResponse;
use kairos_gateway_core::models::route::{MatchMode, Route};
use kairos_gateway_core::models::upstream::{
    LoadBalancePolicy, RetryPolicy, Target, TimeoutPolicy, Upstream,
};
use kairos_gateway_core::plugin::PluginRegistry;
use kairos_gateway_core::ratelimit::{Algorithm, RateLimiter, RateLimiterConfig};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A stub transport that always succeeds, recording which target id served
/// each call so round-robin/consistent-hash distribution can be asserted.
struct RecordingTransport {
    served_by: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn new() -> Self {
        RecordingTransport {
            served_by: Mutex::new(Vec::new()),
        }
    }

    fn history(&self) -> Vec<String> {
        self.served_by.lock().unwrap().clone()
    }
}

impl UpstreamTransport for RecordingTransport {
    fn send<'a>(
        &'a self,
        target: &'a Target,
        _request: &'a GatewayRequest,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<GatewayResponse, String>> {
        self.served_by.lock().unwrap().push(target.id.clone());
        Box::pin(async move { Ok(GatewayResponse::new(200, b"ok".to_vec())) })
    }
}

/// A stub transport that always fails, for circuit-breaker scenarios.
struct AlwaysFailTransport {
    calls: AtomicUsize,
}

impl AlwaysFailTransport {
    fn new() -> Self {
        AlwaysFailTransport {
            calls: AtomicUsize::new(0),
        }
    }
}

impl UpstreamTransport for AlwaysFailTransport {
    fn send<'a>(
        &'a self,
        _target: &'a Target,
        _request: &'a GatewayRequest,
        _timeout: Duration,
    ) -> BoxFuture<'a, Result<GatewayResponse, String>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move { Err("upstream unreachable".to_string()) })
    }
}

fn users_route() -> Route {
    Route {
        id: "users".to_string(),
        name: "users".to_string(),
        methods: vec![Method::Get],
        paths: vec!["/api/users".to_string()],
        match_mode: MatchMode::Prefix,
        upstream_id: "users-upstream".to_string(),
        plugins: vec![],
        enabled: true,
    }
}

fn three_target_upstream() -> Upstream {
    Upstream {
        id: "users-upstream".to_string(),
        targets: vec![
            Target::new("t0", "http://h0", 1),
            Target::new("t1", "http://h1", 1),
            Target::new("t2", "http://h2", 1),
        ],
        policy: LoadBalancePolicy::RoundRobin,
        retry: RetryPolicy { max_retries: 0 },
        timeout: TimeoutPolicy::default(),
        health_check: None,
    }
}

fn request() -> GatewayRequest {
    GatewayRequest::new(Method::Get, "/api/users", "203.0.113.1")
}

#[tokio::test]
async fn round_robin_cycles_through_all_targets_over_three_requests() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport.clone(),
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    );
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    for _ in 0..3 {
        let response = engine.process(request()).await;
        assert_eq!(response.status, 200);
    }

    let history = transport.history();
    assert_eq!(history, vec!["t0", "t1", "t2"]);
}

#[tokio::test]
async fn repeated_upstream_failures_open_the_circuit() {
    let transport = Arc::new(AlwaysFailTransport::new());
    let engine = GatewayEngine::new(
        transport.clone(),
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    );
    // A single target and no retries isolates one dispatch attempt per
    // request, so ten requests drive the breaker through exactly ten
    // circuit-breaker observations.
    engine.register_upstream(Upstream {
        id: "users-upstream".to_string(),
        targets: vec![Target::new("only", "http://h0", 1)],
        policy: LoadBalancePolicy::RoundRobin,
        retry: RetryPolicy { max_retries: 0 },
        timeout: TimeoutPolicy::default(),
        health_check: None,
    });
    engine.set_routes(vec![users_route()]).unwrap();

    for _ in 0..10 {
        let response = engine.process(request()).await;
        assert_eq!(response.status, 502);
    }

    // The eleventh request should fail fast on an open circuit rather than
    // reaching the transport again.
    let calls_before = transport.calls.load(Ordering::Relaxed);
    let response = engine.process(request()).await;
    assert_eq!(response.status, 503);
    assert_eq!(transport.calls.load(Ordering::Relaxed), calls_before);
}

#[tokio::test]
async fn rate_limited_requests_carry_retry_after() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    );
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();
    engine.register_rate_limiter(
        "users",
        RateLimiter::new(RateLimiterConfig {
            algorithm: Algorithm::TokenBucket {
                capacity: 2.0,
                refill_rate_per_sec: 0.001,
                burst: None,
            },
        }),
    );

    let first = engine.process(request()).await;
    let second = engine.process(request()).await;
    let third = engine.process(request()).await;

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);
    assert_eq!(third.status, 429);
    assert!(third.headers.get("retry-after").is_some());
}

#[tokio::test]
async fn ip_filter_rejects_clients_outside_the_whitelist() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_ip_filter(Arc::new(IpFilter::build(
        IpFilterMode::Whitelist,
        &["10.0.0.0/8".to_string()],
    )));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let response = engine.process(request()).await;

    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn waf_blocks_a_sql_injection_attempt_in_the_query_string() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_waf(Arc::new(Waf::build(vec![])));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut malicious = request();
    malicious.path = "/api/users".to_string();
    malicious
        .query
        .insert(
            "id".to_string(),
            kairos_gateway_core::models::request::ParamValue::Single("1' OR '1'='1".to_string()),
        );

    let response = engine.process(malicious).await;

    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn unknown_route_yields_404() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    );
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut missing = request();
    missing.path = "/not/registered".to_string();

    let response = engine.process(missing).await;

    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn request_without_jwt_is_rejected_when_jwt_is_required() {
    let transport = Arc::new(RecordingTransport::new());
    let jwt = JwtValidator::new(JwtConfig {
        secret_or_key: b"a-very-long-secret-value-for-testing".to_vec(),
        algorithm: jsonwebtoken::Algorithm::HS256,
        issuer: None,
        audience: None,
        required_claims: HashSet::new(),
        clock_tolerance_secs: 5,
    });
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_jwt(Arc::new(jwt));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let response = engine.process(request()).await;

    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn request_with_a_valid_bearer_jwt_is_admitted() {
    let transport = Arc::new(RecordingTransport::new());
    let secret = b"a-very-long-secret-value-for-testing".to_vec();
    let jwt_validator = JwtValidator::new(JwtConfig {
        secret_or_key: secret.clone(),
        algorithm: jsonwebtoken::Algorithm::HS256,
        issuer: None,
        audience: None,
        required_claims: HashSet::new(),
        clock_tolerance_secs: 5,
    });
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_jwt(Arc::new(jwt_validator));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
    }
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &Claims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            iat: chrono::Utc::now().timestamp() as usize,
        },
        &jsonwebtoken::EncodingKey::from_secret(&secret),
    )
    .unwrap();

    let mut authorized = request();
    authorized.headers.set("Authorization", format!("Bearer {token}"));

    let response = engine.process(authorized).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn unknown_api_key_is_rejected_when_api_key_auth_is_required() {
    let transport = Arc::new(RecordingTransport::new());
    let records = kairos_gateway_core::admission::records_from_config(vec![
        kairos_gateway_core::admission::ApiKeyConfigEntry {
            key: "secret-key".to_string(),
            record: ApiKeyRecord {
                consumer_id: "acme".to_string(),
                enabled: true,
                expires_at: None,
                scopes: vec![],
            },
        },
    ]);
    let validator = ApiKeyValidator::new(records);
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_api_key(Arc::new(validator));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut wrong_key = request();
    wrong_key.headers.set("X-API-Key", "not-the-right-key");

    let response = engine.process(wrong_key).await;

    assert_eq!(response.status, 401);
}

struct StubIntrospector;
impl TokenIntrospector for StubIntrospector {
    fn introspect<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenInfo, String>> {
        Box::pin(async move {
            Ok(TokenInfo {
                active: token == "good-token",
                consumer_id: "acme".to_string(),
                scopes: vec![],
            })
        })
    }
}

#[tokio::test]
async fn active_oauth2_token_is_admitted() {
    let transport = Arc::new(RecordingTransport::new());
    let validator = OAuth2Validator::new(StubIntrospector);
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_oauth2(Arc::new(validator));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut authorized = request();
    authorized.headers.set("Authorization", "Bearer good-token");

    let response = engine.process(authorized).await;

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn inactive_oauth2_token_is_rejected() {
    let transport = Arc::new(RecordingTransport::new());
    let validator = OAuth2Validator::new(StubIntrospector);
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_oauth2(Arc::new(validator));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut unauthorized = request();
    unauthorized.headers.set("Authorization", "Bearer revoked-token");

    let response = engine.process(unauthorized).await;

    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn cors_headers_are_attached_for_an_allowed_origin() {
    let transport = Arc::new(RecordingTransport::new());
    let engine = GatewayEngine::new(
        transport,
        Arc::new(ReqwestHealthTransport::new()),
        Arc::new(PluginRegistry::new()),
    )
    .with_cors(Arc::new(CorsSettings {
        allowed_origins: vec!["https://app.example.com".to_string()],
        allowed_methods: vec!["GET".to_string()],
        allowed_headers: vec![],
        allow_credentials: false,
        max_age_secs: 600,
    }));
    engine.register_upstream(three_target_upstream());
    engine.set_routes(vec![users_route()]).unwrap();

    let mut cors_request = request();
    cors_request.headers.set("Origin", "https://app.example.com");

    let response = engine.process(cors_request).await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.headers.get("access-control-allow-origin"),
        Some("https://app.example.com")
    );
}
