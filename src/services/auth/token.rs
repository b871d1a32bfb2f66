use axum::http::{HeaderMap, HeaderName};

/// Pull the bearer token out of `header`.
///
/// - absent / blank / non UTF-8 header => `None` (no token supplied)
/// - value starting with `prefix` => the first occurrence of `prefix` is stripped
/// - anything else is returned unchanged
pub fn extract_token(headers: &HeaderMap, header: &HeaderName, prefix: &str) -> Option<String> {
    let raw = headers.get(header)?.to_str().ok()?;
    if raw.trim().is_empty() {
        return None;
    }

    let token = if !prefix.is_empty() && raw.starts_with(prefix) {
        raw.replacen(prefix, "", 1)
    } else {
        raw.to_string()
    };

    if token.trim().is_empty() {
        return None;
    }

    Some(token)
}

/// Short, log-safe fingerprint of a token.
pub fn redact(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{}...({} chars)", head, token.chars().count())
}
