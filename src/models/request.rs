use crate::util::HeaderMap;
use std::collections::HashMap;
use std::time::Instant;

/// HTTP method, restricted to the set the teacher's `Router::validate`
/// whitelists (`GET, POST, PUT, DELETE, HEAD, OPTIONS, PATCH, TRACE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
        };
        write!(f, "{s}")
    }
}

/// A single value or an ordered list of values, for headers/query params
/// that may legally repeat.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    pub fn first(&self) -> &str {
        match self {
            ParamValue::Single(s) => s,
            ParamValue::Multi(v) => v.first().map(|s| s.as_str()).unwrap_or(""),
        }
    }
}

/// An inbound request as it arrives at the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub id: String,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: HashMap<String, ParamValue>,
    pub body: Vec<u8>,
    pub client_addr: String,
    pub arrived_at: Instant,
    pub consumer_id: Option<String>,
}

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>, client_addr: impl Into<String>) -> Self {
        GatewayRequest {
            id: uuid::Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: HashMap::new(),
            body: Vec::new(),
            client_addr: client_addr.into(),
            arrived_at: Instant::now(),
            consumer_id: None,
        }
    }
}
