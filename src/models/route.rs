use super::request::Method;
use crate::plugin::PluginDescriptor;
use serde::{Deserialize, Serialize};

/// Which tier of the resolver a route is matched by.
///
/// Generalizes the static-vs-regex split in `utils::route_matcher`'s
/// `RouteMatcher` (which only distinguished exact-match and dynamic/regex
/// routes) into the three explicit tiers the resolver walks in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Prefix,
    Regex,
}

/// A rule mapping a method+path shape to an upstream and a plugin chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: String,
    pub methods: Vec<Method>,
    pub paths: Vec<String>,
    pub match_mode: MatchMode,
    pub upstream_id: String,
    #[serde(default)]
    pub plugins: Vec<PluginDescriptor>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum RouteValidationError {
    #[error("route {id} must declare at least one method")]
    NoMethods { id: String },
    #[error("route {id} must declare at least one path")]
    NoPaths { id: String },
    #[error("route {id} has invalid regex pattern {pattern}: {source}")]
    InvalidPattern {
        id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl Route {
    /// Mirrors `models::router::Router::validate`'s style: fail fast on the
    /// first structural problem, and for regex routes, compile eagerly so
    /// resolution-time compilation failure (forbidden by the spec) cannot
    /// happen.
    pub fn validate(&self) -> Result<(), RouteValidationError> {
        if self.methods.is_empty() {
            return Err(RouteValidationError::NoMethods {
                id: self.id.clone(),
            });
        }
        if self.paths.is_empty() {
            return Err(RouteValidationError::NoPaths {
                id: self.id.clone(),
            });
        }
        if self.match_mode == MatchMode::Regex {
            for pattern in &self.paths {
                regex::Regex::new(pattern).map_err(|source| RouteValidationError::InvalidPattern {
                    id: self.id.clone(),
                    pattern: pattern.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn allows_method(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }
}
