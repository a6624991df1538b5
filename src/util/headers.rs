//! Case-insensitive header storage with hop-by-hop stripping and the
//! forwarding headers the wire protocol requires on egress.
//!
//! Generalizes the `SKIP_HEADERS` filtering in the teacher's
//! `RouteHandler::build_headers_optimized`, which only stripped
//! `host`/`connection`/`upgrade`/`proxy-connection`, to the full hop-by-hop
//! set named by the spec.

use std::collections::HashMap;

/// Headers that must never be forwarded between hops.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// An ordered, case-insensitive multimap of header name to values.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: HashMap<String, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap {
            entries: HashMap::new(),
        }
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(Self::key(name))
            .or_default()
            .push(value.into());
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(Self::key(name), vec![value.into()]);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&Self::key(name))
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&Self::key(name))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&Self::key(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Strips every hop-by-hop header, returning a new map safe to forward.
    pub fn strip_hop_by_hop(&self) -> HeaderMap {
        let mut out = HeaderMap::new();
        for (name, value) in self.iter() {
            if !HOP_BY_HOP.contains(&name) {
                out.insert(name, value.to_string());
            }
        }
        out
    }

    /// Applies the egress forwarding headers named in the wire protocol:
    /// `X-Request-Id`, `X-Forwarded-For` (appended), `X-Real-IP` (set if
    /// missing), `X-Forwarded-Proto`, `X-Forwarded-Host`.
    pub fn apply_forwarding(
        &mut self,
        request_id: &str,
        client_addr: &str,
        proto: &str,
        host: &str,
    ) {
        self.set("x-request-id", request_id.to_string());
        let forwarded_for = match self.get("x-forwarded-for") {
            Some(existing) => format!("{existing}, {client_addr}"),
            None => client_addr.to_string(),
        };
        self.set("x-forwarded-for", forwarded_for);
        if !self.contains("x-real-ip") {
            self.set("x-real-ip", client_addr.to_string());
        }
        self.set("x-forwarded-proto", proto.to_string());
        self.set("x-forwarded-host", host.to_string());
    }
}
