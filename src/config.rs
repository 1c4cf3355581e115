use std::env;

use crate::models::user::Role;
use crate::services::token::DEFAULT_REFRESH_BUFFER_SECONDS;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub refresh_buffer_seconds: i64,
    pub session_cookie_name: String,
    pub refresh_cookie_name: String,
    pub csrf_max_age_seconds: u64,
    pub cookie_secure: bool,
    pub login_path: String,
    pub unauthorized_path: String,
    pub protected_routes: Vec<(String, Role)>,
    pub static_dir: String,
    pub app_base_url: String,
    pub oauth_redirect_base: String,
    // OAuth client ids (optional; a missing id disables that provider)
    pub google_client_id: Option<String>,
    pub apple_client_id: Option<String>,
    pub facebook_client_id: Option<String>,
    pub github_client_id: Option<String>,
}

pub const DEFAULT_PROTECTED_ROUTES: &str = "/account=user,/bookings=user,/host=host,/agency=agency,/admin=admin";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_base_url = env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_issuer: optional("JWT_ISSUER"),
            refresh_buffer_seconds: env::var("TOKEN_REFRESH_BUFFER_SECONDS")
                .ok()
                .map(|v| v.parse::<i64>())
                .transpose()?
                .unwrap_or(DEFAULT_REFRESH_BUFFER_SECONDS),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "access_token".into()),
            refresh_cookie_name: env::var("REFRESH_COOKIE_NAME")
                .unwrap_or_else(|_| "refresh_token".into()),
            csrf_max_age_seconds: env::var("CSRF_MAX_AGE_SECONDS")
                .unwrap_or_else(|_| "3600".into())
                .parse()?,
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".into()),
            unauthorized_path: env::var("UNAUTHORIZED_PATH").unwrap_or_else(|_| "/".into()),
            protected_routes: parse_protected_routes(
                &env::var("PROTECTED_ROUTES").unwrap_or_else(|_| DEFAULT_PROTECTED_ROUTES.into()),
            )?,
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./public".into()),
            oauth_redirect_base: optional("OAUTH_REDIRECT_BASE").unwrap_or_else(|| app_base_url.clone()),
            app_base_url,
            google_client_id: optional("OAUTH_GOOGLE_CLIENT_ID"),
            apple_client_id: optional("OAUTH_APPLE_CLIENT_ID"),
            facebook_client_id: optional("OAUTH_FACEBOOK_CLIENT_ID"),
            github_client_id: optional("OAUTH_GITHUB_CLIENT_ID"),
        })
    }

    /// Baseline configuration for tests and local tooling.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            jwt_secret: jwt_secret.into(),
            jwt_issuer: None,
            refresh_buffer_seconds: DEFAULT_REFRESH_BUFFER_SECONDS,
            session_cookie_name: "access_token".into(),
            refresh_cookie_name: "refresh_token".into(),
            csrf_max_age_seconds: 3600,
            cookie_secure: false,
            login_path: "/login".into(),
            unauthorized_path: "/".into(),
            protected_routes: parse_protected_routes(DEFAULT_PROTECTED_ROUTES)
                .unwrap_or_default(),
            static_dir: "./public".into(),
            app_base_url: "http://localhost:3000".into(),
            oauth_redirect_base: "http://localhost:3000".into(),
            google_client_id: None,
            apple_client_id: None,
            facebook_client_id: None,
            github_client_id: None,
        }
    }
}

/// Parses `"/prefix=role,/other=role"` into an ordered rule list.
pub fn parse_protected_routes(raw: &str) -> anyhow::Result<Vec<(String, Role)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, role) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Invalid PROTECTED_ROUTES entry: {entry}"))?;
            let prefix = prefix.trim();
            if !prefix.starts_with('/') {
                anyhow::bail!("Protected route prefix must start with '/': {prefix}");
            }
            Ok((prefix.to_string(), role.trim().parse()?))
        })
        .collect()
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_default_route_table() {
        let rules = parse_protected_routes(DEFAULT_PROTECTED_ROUTES).unwrap();
        assert_eq!(rules.len(), 5);
        assert_eq!(rules[2], ("/host".to_string(), Role::Host));
        assert_eq!(rules[4], ("/admin".to_string(), Role::Admin));
    }

    #[test]
    fn test_rejects_malformed_entries() {
        assert!(parse_protected_routes("/account").is_err());
        assert!(parse_protected_routes("account=user").is_err());
        assert!(parse_protected_routes("/account=superuser").is_err());
    }

    #[test]
    fn test_ignores_blank_entries() {
        let rules = parse_protected_routes(" /a=user, ,").unwrap();
        assert_eq!(rules, vec![("/a".to_string(), Role::User)]);
    }
}
