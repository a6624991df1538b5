use crate::util::HeaderMap;

/// Normalizes a request path: strips control and shell metacharacters,
/// collapses repeated `/`, removes `..` segments, and percent-decodes once.
/// Idempotent: `sanitize_path(sanitize_path(x)) == sanitize_path(x)`.
pub fn sanitize_path(path: &str) -> String {
    let decoded = percent_decode_once(path);
    let stripped: String = decoded
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ';' | '|' | '&' | '`' | '$'))
        .collect();

    let mut segments = Vec::new();
    for segment in stripped.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            segments.pop();
            continue;
        }
        segments.push(segment);
    }

    let mut normalized = String::from("/");
    normalized.push_str(&segments.join("/"));
    normalized
}

fn percent_decode_once(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
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

/// Lowercases header names and strips newlines from values (header
/// injection defense), leaving the map otherwise unchanged.
pub fn sanitize_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers.iter() {
        let clean_value: String = value.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        out.insert(name, clean_value);
    }
    out
}

/// Trims leading/trailing whitespace from a UTF-8 body so equivalent
/// payloads compare equal downstream (e.g. in the WAF and cache
/// fingerprint). Not full Unicode NFC normalization — see DESIGN.md.
pub fn sanitize_body(body: &str) -> String {
    body.trim().to_string()
}
