use crate::util::HeaderMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiKeyRecord {
    pub consumer_id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// A plaintext key paired with the record it resolves to, as it appears in
/// configuration. The plaintext never survives past [`records_from_config`]:
/// it is hashed immediately into the lookup map [`ApiKeyValidator`] holds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiKeyConfigEntry {
    pub key: String,
    #[serde(flatten)]
    pub record: ApiKeyRecord,
}

pub fn records_from_config(entries: Vec<ApiKeyConfigEntry>) -> HashMap<String, ApiKeyRecord> {
    entries
        .into_iter()
        .map(|entry| (hash_key(&entry.key), entry.record))
        .collect()
}

pub(crate) fn hash_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Extracts a presented key from `Authorization: Bearer`, `X-API-Key`, or
/// the `api_key` query parameter, hashes it with SHA-256, and looks it up
/// by hash — keys are never stored or compared in plaintext.
pub struct ApiKeyValidator {
    by_hash: HashMap<String, ApiKeyRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiKeyError {
    #[error("no API key presented")]
    Missing,
    #[error("unknown API key")]
    Unknown,
    #[error("API key disabled")]
    Disabled,
    #[error("API key expired")]
    Expired,
    #[error("API key lacks required scope {0}")]
    InsufficientScope(String),
}

impl ApiKeyValidator {
    pub fn new(records: HashMap<String, ApiKeyRecord>) -> Self {
        ApiKeyValidator { by_hash: records }
    }

    fn extract(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
        if let Some(auth) = headers.get("authorization") {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
        if let Some(key) = headers.get("x-api-key") {
            return Some(key.to_string());
        }
        query.get("api_key").cloned()
    }

    pub fn validate(
        &self,
        headers: &HeaderMap,
        query: &HashMap<String, String>,
        required_scope: Option<&str>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<&ApiKeyRecord, ApiKeyError> {
        let raw = Self::extract(headers, query).ok_or(ApiKeyError::Missing)?;
        let hashed = hash_key(&raw);
        let record = self.by_hash.get(&hashed).ok_or(ApiKeyError::Unknown)?;
        if !record.enabled {
            return Err(ApiKeyError::Disabled);
        }
        if let Some(expiry) = record.expires_at {
            if now >= expiry {
                return Err(ApiKeyError::Expired);
            }
        }
        if let Some(scope) = required_scope {
            if !record.scopes.iter().any(|s| s == scope) {
                return Err(ApiKeyError::InsufficientScope(scope.to_string()));
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ApiKeyValidator {
        let mut records = HashMap::new();
        records.insert(
            hash_key("secret-key"),
            ApiKeyRecord {
                consumer_id: "acme".to_string(),
                enabled: true,
                expires_at: None,
                scopes: vec!["read".to_string()],
            },
        );
        ApiKeyValidator::new(records)
    }

    #[test]
    fn accepts_key_via_header() {
        let validator = validator();
        let mut headers = HeaderMap::new();
        headers.set("X-API-Key", "secret-key");
        let record = validator
            .validate(&headers, &HashMap::new(), None, chrono::Utc::now())
            .unwrap();
        assert_eq!(record.consumer_id, "acme");
    }

    #[test]
    fn rejects_unknown_key() {
        let validator = validator();
        let mut headers = HeaderMap::new();
        headers.set("X-API-Key", "wrong-key");
        let err = validator
            .validate(&headers, &HashMap::new(), None, chrono::Utc::now())
            .unwrap_err();
        assert!(matches!(err, ApiKeyError::Unknown));
    }

    #[test]
    fn rejects_insufficient_scope() {
        let validator = validator();
        let mut headers = HeaderMap::new();
        headers.set("X-API-Key", "secret-key");
        let err = validator
            .validate(&headers, &HashMap::new(), Some("write"), chrono::Utc::now())
            .unwrap_err();
        assert!(matches!(err, ApiKeyError::InsufficientScope(_)));
    }
}
