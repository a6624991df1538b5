use std::collections::HashMap;

/// Extracts named path parameters from a `:name`-style pattern against a
/// concrete request path of equal segment arity. A purely side utility:
/// the resolver's tiers don't depend on it, but route handlers that need
/// `{id}`-shaped values out of a matched path do.
pub fn extract_params(pattern: &str, actual: &str) -> Option<HashMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let actual_segments: Vec<&str> = actual.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != actual_segments.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (p, a) in pattern_segments.iter().zip(actual_segments.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            let decoded = percent_decode(a);
            params.insert(name.to_string(), decoded);
        } else if p != a {
            return None;
        }
    }
    Some(params)
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&segment[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_param() {
        let params = extract_params("/users/:id", "/users/42").unwrap();
        assert_eq!(params.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn rejects_differing_arity() {
        assert!(extract_params("/users/:id", "/users/42/posts").is_none());
    }

    #[test]
    fn rejects_literal_mismatch() {
        assert!(extract_params("/users/:id", "/accounts/42").is_none());
    }

    #[test]
    fn decodes_percent_escapes() {
        let params = extract_params("/search/:q", "/search/a%20b").unwrap();
        assert_eq!(params.get("q"), Some(&"a b".to_string()));
    }
}
