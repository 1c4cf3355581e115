use url::form_urlencoded;

/// Accept only same-site relative paths as post-login destinations.
/// Protocol-relative (`//host`), backslash tricks and absolute URLs are dropped.
pub fn sanitize_return_to(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if !raw.starts_with('/') || raw.starts_with("//") || raw.starts_with("/\\") {
        return None;
    }
    if raw.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(raw.to_string())
}

/// Append one query parameter to a relative path.
pub fn with_query(path: &str, key: &str, value: &str) -> String {
    let encoded: String = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{encoded}")
}
