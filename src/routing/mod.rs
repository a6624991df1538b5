//! Exact/prefix/regex route resolution.
//!
//! Generalizes `utils::route_matcher::RouteMatcher`, which only split routes
//! into a static (exact) `AHashMap` and a regex-compiled dynamic list, into
//! the three explicit tiers the spec names: exact, prefix (longest first),
//! then regex (registration order). Kept the teacher's `ahash`-backed exact
//! table and eager regex compilation at registration time (never at
//! resolve time — a resolve-time compile failure is forbidden by design).

pub mod path_params;
pub mod resolver;

pub use resolver::{RouteResolver, RouteResolverError};
