use sha2::{Digest, Sha256};

/// A stable cache key: method, path, query serialized in sorted order, and
/// the selected vary-header values. Sorting the query keys makes
/// `?a=1&b=2` and `?b=2&a=1` fingerprint identically.
pub fn fingerprint(method: &str, path: &str, query: &[(String, String)], vary: &[String]) -> String {
    let mut sorted_query = query.to_vec();
    sorted_query.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\0");
    hasher.update(path.as_bytes());
    for (k, v) in &sorted_query {
        hasher.update(b"\0q\0");
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
    }
    for v in vary {
        hasher.update(b"\0v\0");
        hasher.update(v.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_order_does_not_affect_fingerprint() {
        let a = fingerprint("GET", "/x", &[("a".into(), "1".into()), ("b".into(), "2".into())], &[]);
        let b = fingerprint("GET", "/x", &[("b".into(), "2".into()), ("a".into(), "1".into())], &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_vary_values_differ() {
        let a = fingerprint("GET", "/x", &[], &["gzip".into()]);
        let b = fingerprint("GET", "/x", &[], &["br".into()]);
        assert_ne!(a, b);
    }
}
