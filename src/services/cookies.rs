use axum::http::{header, HeaderMap};

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(&prefix)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

/// Build a `Set-Cookie` value for an HttpOnly, root-scoped cookie.
pub fn build_cookie(name: &str, value: &str, max_age: u64, same_site: SameSite, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={value}; HttpOnly; SameSite={}; Path=/; Max-Age={max_age}",
        same_site.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build a `Set-Cookie` value that removes the cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, SameSite::Lax, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc.def.ghi; other=1"),
        );
        assert_eq!(get_cookie(&headers, "access_token").as_deref(), Some("abc.def.ghi"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_get_cookie_does_not_match_suffix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("xcsrf_token=1"));
        assert_eq!(get_cookie(&headers, "csrf_token"), None);
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("csrf_token="));
        assert_eq!(get_cookie(&headers, "csrf_token"), None);
    }

    #[test]
    fn test_build_cookie_attributes() {
        let c = build_cookie("csrf_token", "v", 3600, SameSite::Strict, true);
        assert_eq!(c, "csrf_token=v; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600; Secure");
        assert_eq!(
            clear_cookie("access_token", false),
            "access_token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
