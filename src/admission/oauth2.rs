use crate::util::HeaderMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub active: bool,
    pub consumer_id: String,
    pub scopes: Vec<String>,
}

/// Configuration for the default RFC 7662 introspection client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Settings {
    pub introspection_url: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Calls an RFC 7662-shaped `/introspect` endpoint with HTTP basic auth.
/// Concrete counterpart to [`TokenIntrospector`], grounded in the same
/// `reqwest::Client` construction `ReqwestTransport` uses.
pub struct HttpTokenIntrospector {
    client: reqwest::Client,
    settings: OAuth2Settings,
}

impl HttpTokenIntrospector {
    pub fn new(settings: OAuth2Settings) -> Self {
        HttpTokenIntrospector {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

impl TokenIntrospector for HttpTokenIntrospector {
    fn introspect<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenInfo, String>> {
        Box::pin(async move {
            #[derive(Deserialize)]
            struct IntrospectResponse {
                active: bool,
                #[serde(default)]
                sub: Option<String>,
                #[serde(default)]
                scope: Option<String>,
            }

            let response = self
                .client
                .post(&self.settings.introspection_url)
                .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
                .form(&[("token", token)])
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let parsed: IntrospectResponse = response.json().await.map_err(|e| e.to_string())?;
            Ok(TokenInfo {
                active: parsed.active,
                consumer_id: parsed.sub.unwrap_or_default(),
                scopes: parsed
                    .scope
                    .map(|s| s.split_whitespace().map(|s| s.to_string()).collect())
                    .unwrap_or_default(),
            })
        })
    }
}

/// An OAuth2 token introspection endpoint, abstracted so a real
/// authorization server (or a local cache in front of one) can be slotted
/// in without this crate depending on a specific HTTP client configuration.
pub trait TokenIntrospector: Send + Sync {
    fn introspect<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenInfo, String>>;
}

#[derive(Debug, thiserror::Error)]
pub enum OAuth2Error {
    #[error("no bearer token presented")]
    Missing,
    #[error("introspection failed: {0}")]
    IntrospectionFailed(String),
    #[error("token inactive or revoked")]
    Inactive,
    #[error("token lacks required scope {0}")]
    InsufficientScope(String),
}

pub struct OAuth2Validator<I: TokenIntrospector> {
    introspector: I,
}

impl<I: TokenIntrospector> OAuth2Validator<I> {
    pub fn new(introspector: I) -> Self {
        OAuth2Validator { introspector }
    }

    fn extract_token(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    }

    pub async fn validate(
        &self,
        headers: &HeaderMap,
        required_scope: Option<&str>,
    ) -> Result<TokenInfo, OAuth2Error> {
        let token = Self::extract_token(headers).ok_or(OAuth2Error::Missing)?;
        let info = self
            .introspector
            .introspect(&token)
            .await
            .map_err(OAuth2Error::IntrospectionFailed)?;
        if !info.active {
            return Err(OAuth2Error::Inactive);
        }
        if let Some(scope) = required_scope {
            if !info.scopes.iter().any(|s| s == scope) {
                return Err(OAuth2Error::InsufficientScope(scope.to_string()));
            }
        }
        Ok(info)
    }
}

/// Object-safe façade over `OAuth2Validator<I>` so an engine that doesn't
/// want to be generic over the introspector type can hold one behind an
/// `Arc<dyn _>`, the same way [`super::oauth2::TokenIntrospector`] lets a
/// test substitute a stub for [`HttpTokenIntrospector`].
pub trait OAuth2Check: Send + Sync {
    fn check<'a>(
        &'a self,
        headers: &'a HeaderMap,
        required_scope: Option<&'a str>,
    ) -> BoxFuture<'a, Result<TokenInfo, OAuth2Error>>;
}

impl<I: TokenIntrospector> OAuth2Check for OAuth2Validator<I> {
    fn check<'a>(
        &'a self,
        headers: &'a HeaderMap,
        required_scope: Option<&'a str>,
    ) -> BoxFuture<'a, Result<TokenInfo, OAuth2Error>> {
        Box::pin(self.validate(headers, required_scope))
    }
}
