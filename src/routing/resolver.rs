use crate::models::request::Method;
use crate::models::route::{MatchMode, Route, RouteValidationError};
use ahash::AHashMap;
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum RouteResolverError {
    #[error("duplicate route id {0}")]
    DuplicateRouteId(String),
    #[error(transparent)]
    Validation(#[from] RouteValidationError),
}

struct CompiledRegexRoute {
    regex: Regex,
    route: Route,
}

/// A single logical route set, indexed into three tiers for deterministic,
/// prioritized resolution: exact, then prefix (longest first), then regex
/// (registration order).
///
/// Immutable once built — a config reload builds a fresh `RouteResolver` and
/// swaps the whole value, so readers never observe a partially-updated
/// table (§5's "whole-value swap, lock-free read" route-table discipline).
pub struct RouteResolver {
    exact: AHashMap<(Method, String), Route>,
    prefix: Vec<Route>,
    regex: Vec<CompiledRegexRoute>,
}

impl RouteResolver {
    pub fn build(routes: Vec<Route>) -> Result<Self, RouteResolverError> {
        let mut seen = std::collections::HashSet::new();
        let mut exact = AHashMap::new();
        let mut prefix = Vec::new();
        let mut regex = Vec::new();

        for route in routes {
            route.validate()?;
            if !seen.insert(route.id.clone()) {
                return Err(RouteResolverError::DuplicateRouteId(route.id));
            }
            match route.match_mode {
                MatchMode::Exact => {
                    for method in &route.methods {
                        for path in &route.paths {
                            exact.insert((*method, normalize(path)), route.clone());
                        }
                    }
                }
                MatchMode::Prefix => {
                    prefix.push(route);
                }
                MatchMode::Regex => {
                    for pattern in &route.paths {
                        // Already validated to compile in `Route::validate`.
                        let compiled = Regex::new(pattern).expect("validated above");
                        regex.push(CompiledRegexRoute {
                            regex: compiled,
                            route: route.clone(),
                        });
                    }
                }
            }
        }

        // Longest-prefix-first so a more specific prefix always wins.
        prefix.sort_by_key(|r| std::cmp::Reverse(longest_path_len(r)));

        Ok(RouteResolver { exact, prefix, regex })
    }

    /// Resolves a request path. Returns the route even if disabled; the
    /// engine enforces disabled-route semantics so this stays pure.
    pub fn resolve(&self, method: Method, path: &str) -> Option<&Route> {
        let normalized = normalize(path);

        if let Some(route) = self.exact.get(&(method, normalized.clone())) {
            return Some(route);
        }

        for route in &self.prefix {
            if !route.allows_method(method) {
                continue;
            }
            if route.paths.iter().any(|p| prefix_matches(p, &normalized)) {
                return Some(route);
            }
        }

        for entry in &self.regex {
            if !entry.route.allows_method(method) {
                continue;
            }
            if entry.regex.is_match(&normalized) {
                return Some(&entry.route);
            }
        }

        None
    }
}

fn longest_path_len(route: &Route) -> usize {
    route.paths.iter().map(|p| p.len()).max().unwrap_or(0)
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// `/api` matches `/api` and `/api/...` but not `/apifoo`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    let trimmed_prefix = prefix.trim_end_matches('/');
    if trimmed_prefix.is_empty() {
        return true;
    }
    path == trimmed_prefix || path.starts_with(&format!("{trimmed_prefix}/"))
}
