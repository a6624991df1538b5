//! Admission components: IP filter, WAF, API key, JWT, OAuth2, and the
//! request sanitizer.
//!
//! JWT validation generalizes `middleware::auth::JwtAuth`/`JwtConfig`/
//! `Claims` (issuer/audience/required-claims validation against
//! `jsonwebtoken::Validation`) beyond its Actix-specific `Transform`/
//! `Service` shape into a transport-agnostic validator with three
//! extraction sites (bearer, query, cookie). The other five components are
//! new, grounded in the teacher's overall "validation middleware" shape
//! (`middleware::validation`, `middleware::security`) and, for WAF pattern
//! families, on the WAF-shaped files in the broader example pack.

pub mod api_key;
pub mod cors;
pub mod ip_filter;
pub mod jwt;
pub mod oauth2;
pub mod sanitizer;
pub mod waf;

pub use api_key::{records_from_config, ApiKeyConfigEntry, ApiKeyRecord, ApiKeyValidator};
pub use cors::CorsSettings;
pub use ip_filter::{IpFilter, IpFilterMode};
pub use jwt::{JwtConfig, JwtValidator};
pub use oauth2::{
    HttpTokenIntrospector, OAuth2Check, OAuth2Error, OAuth2Settings, OAuth2Validator,
    TokenInfo, TokenIntrospector,
};
pub use sanitizer::{sanitize_body, sanitize_headers, sanitize_path};
pub use waf::{Waf, WafAction, WafRule};
