use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identity artifacts carried on a request once admission authenticates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scopes: HashSet<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl Consumer {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}
