use crate::util::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Generalizes `middleware::auth::Claims`: the same `sub/exp/iat/iss/aud`
/// shape plus `roles`, kept permissive (`extra`) for claims the teacher's
/// fixed struct couldn't carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret_or_key: Vec<u8>,
    pub algorithm: Algorithm,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    #[serde(default)]
    pub required_claims: HashSet<String>,
    #[serde(default = "default_clock_tolerance")]
    pub clock_tolerance_secs: u64,
}

fn default_clock_tolerance() -> u64 {
    5
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("no token presented")]
    Missing,
    #[error("token invalid or expired: {0}")]
    Invalid(String),
    #[error("required claim {0} missing")]
    MissingClaim(String),
}

/// Extraction sites generalized from the teacher's single `Authorization`
/// bearer check to the three the spec names: bearer header, `token` query
/// param, `jwt` cookie.
pub struct JwtValidator {
    config: JwtConfig,
}

impl JwtValidator {
    pub fn new(config: JwtConfig) -> Self {
        JwtValidator { config }
    }

    fn extract_token(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
        if let Some(auth) = headers.get("authorization") {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
        if let Some(token) = query.get("token") {
            return Some(token.clone());
        }
        if let Some(cookie_header) = headers.get("cookie") {
            for pair in cookie_header.split(';') {
                let pair = pair.trim();
                if let Some(value) = pair.strip_prefix("jwt=") {
                    return Some(value.to_string());
                }
            }
        }
        None
    }

    pub fn validate(
        &self,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
    ) -> Result<Claims, JwtError> {
        let token = Self::extract_token(headers, query).ok_or(JwtError::Missing)?;

        let decoding_key = match self.config.algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                DecodingKey::from_secret(&self.config.secret_or_key)
            }
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 => {
                DecodingKey::from_rsa_pem(&self.config.secret_or_key)
                    .map_err(|e| JwtError::Invalid(e.to_string()))?
            }
            Algorithm::ES256 | Algorithm::ES384 => {
                DecodingKey::from_ec_pem(&self.config.secret_or_key)
                    .map_err(|e| JwtError::Invalid(e.to_string()))?
            }
            other => return Err(JwtError::Invalid(format!("unsupported algorithm {other:?}"))),
        };

        let mut validation = Validation::new(self.config.algorithm);
        validation.leeway = self.config.clock_tolerance_secs;
        if let Some(iss) = &self.config.issuer {
            validation.set_issuer(&[iss]);
        }
        if let Some(aud) = &self.config.audience {
            validation.set_audience(&[aud]);
        }

        let decoded = decode::<Claims>(&token, &decoding_key, &validation)
            .map_err(|e| JwtError::Invalid(e.to_string()))?;

        for required in &self.config.required_claims {
            let present = match required.as_str() {
                "roles" => !decoded.claims.roles.is_empty(),
                "iss" => decoded.claims.iss.is_some(),
                "aud" => decoded.claims.aud.is_some(),
                other => decoded.claims.extra.contains_key(other),
            };
            if !present {
                return Err(JwtError::MissingClaim(required.clone()));
            }
        }

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(secret: &str, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let claims = Claims {
            sub: "user-1".to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            iat: chrono::Utc::now().timestamp() as usize,
            iss: Some("gateway".to_string()),
            aud: None,
            roles: vec!["admin".to_string()],
            extra: HashMap::new(),
        };
        let token = make_token("a-very-long-secret-value-for-testing", &claims);
        let validator = JwtValidator::new(JwtConfig {
            secret_or_key: b"a-very-long-secret-value-for-testing".to_vec(),
            algorithm: Algorithm::HS256,
            issuer: Some("gateway".to_string()),
            audience: None,
            required_claims: HashSet::new(),
            clock_tolerance_secs: 5,
        });
        let mut headers = HeaderMap::new();
        headers.set("Authorization", format!("Bearer {token}"));
        let result = validator.validate(&headers, &HashMap::new()).unwrap();
        assert_eq!(result.sub, "user-1");
    }

    #[test]
    fn missing_token_is_rejected() {
        let validator = JwtValidator::new(JwtConfig {
            secret_or_key: b"a-very-long-secret-value-for-testing".to_vec(),
            algorithm: Algorithm::HS256,
            issuer: None,
            audience: None,
            required_claims: HashSet::new(),
            clock_tolerance_secs: 5,
        });
        let err = validator.validate(&HeaderMap::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, JwtError::Missing));
    }
}
