use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;

use crate::config::Config;
use crate::error::AppError;
use crate::models::user::{Role, Session};
use crate::services::{metrics::GUARD_DECISIONS_COUNTER, redirect::with_query};
use crate::AppState;

pub const RETURN_TO_PARAM: &str = "returnTo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Unauthenticated,
    Forbidden,
}

/// The one capability check every app shares.
/// `required = None` means any authenticated session will do.
pub fn authorize(session: Option<&Session>, required: Option<Role>) -> Access {
    match (session, required) {
        (None, _) => Access::Unauthenticated,
        (Some(_), None) => Access::Allowed,
        (Some(s), Some(role)) if s.user.role.satisfies(role) => Access::Allowed,
        (Some(_), Some(_)) => Access::Forbidden,
    }
}

/// Path prefixes that need a session, each with the role it requires.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<(String, Role)>,
}

impl RoutePolicy {
    pub fn new(mut rules: Vec<(String, Role)>) -> Self {
        // Longest prefix wins
        rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { rules }
    }

    pub fn required_role(&self, path: &str) -> Option<Role> {
        self.rules
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, path))
            .map(|(_, role)| *role)
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// The path as the static file service resolves it: percent-decoded, with
/// empty and `.` segments dropped. `None` for `..` segments, NUL bytes or
/// non-UTF-8 input, which the file service refuses as well.
pub fn canonical_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let mut canonical = String::with_capacity(decoded.len() + 1);
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\0') => return None,
            s => {
                canonical.push('/');
                canonical.push_str(s);
            }
        }
    }
    if canonical.is_empty() {
        canonical.push('/');
    }
    Some(canonical)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Not a protected path.
    Public,
    Allow,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    policy: RoutePolicy,
    login_path: String,
    unauthorized_path: String,
}

impl RouteGuard {
    pub fn new(policy: RoutePolicy, login_path: impl Into<String>, unauthorized_path: impl Into<String>) -> Self {
        Self {
            policy,
            login_path: login_path.into(),
            unauthorized_path: unauthorized_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RoutePolicy::new(config.protected_routes.clone()),
            config.login_path.clone(),
            config.unauthorized_path.clone(),
        )
    }

    /// `path` must already be canonical (see [`canonical_path`]).
    pub fn is_protected(&self, path: &str) -> bool {
        self.policy.required_role(path).is_some()
    }

    /// One decision per request. `original` is the path plus query, kept as
    /// the post-login destination.
    pub fn evaluate(&self, path: &str, original: &str, session: Option<&Session>) -> GuardDecision {
        let Some(required) = self.policy.required_role(path) else {
            return GuardDecision::Public;
        };

        match authorize(session, Some(required)) {
            Access::Allowed => GuardDecision::Allow,
            Access::Unauthenticated => {
                GuardDecision::Redirect(with_query(&self.login_path, RETURN_TO_PARAM, original))
            }
            Access::Forbidden => GuardDecision::Redirect(self.unauthorized_path.clone()),
        }
    }
}

/// Middleware in front of every view. Public paths pass untouched; protected
/// ones either continue with the `Session` in request extensions or get a 302.
/// Rules are matched against the canonical path so encoded or doubled
/// separators cannot slip past a prefix.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(path) = canonical_path(request.uri().path()) else {
        GUARD_DECISIONS_COUNTER.with_label_values(&["rejected"]).inc();
        tracing::warn!("route guard: rejected path {}", request.uri().path());
        return AppError::BadRequest("Invalid request path".into()).into_response();
    };
    if !state.guard.is_protected(&path) {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let session = state.sessions.resolve(&mut parts.extensions, &parts.headers);
    let original = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.clone(),
    };

    match state.guard.evaluate(&path, &original, session.as_ref()) {
        GuardDecision::Public | GuardDecision::Allow => {
            GUARD_DECISIONS_COUNTER.with_label_values(&["allowed"]).inc();
            if let Some(session) = session {
                parts.extensions.insert(session);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        GuardDecision::Redirect(target) => {
            let label = if session.is_some() { "forbidden" } else { "unauthenticated" };
            GUARD_DECISIONS_COUNTER.with_label_values(&[label]).inc();
            tracing::info!("route guard: {} {} -> {}", label, path, target);
            (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserSummary;
    use chrono::{Duration, Utc};

    fn session(role: Role) -> Session {
        Session {
            user: UserSummary {
                id: "u1".into(),
                email: None,
                role,
                display_name: None,
            },
            session_id: "s1".into(),
            expires_at: Utc::now() + Duration::minutes(10),
        }
    }

    fn guard() -> RouteGuard {
        RouteGuard::new(
            RoutePolicy::new(vec![
                ("/account".into(), Role::User),
                ("/host".into(), Role::Host),
                ("/host/public".into(), Role::Guest),
                ("/admin".into(), Role::Admin),
            ]),
            "/login",
            "/",
        )
    }

    #[test]
    fn test_authorize_matrix() {
        assert_eq!(authorize(None, None), Access::Unauthenticated);
        assert_eq!(authorize(None, Some(Role::User)), Access::Unauthenticated);
        assert_eq!(authorize(Some(&session(Role::User)), None), Access::Allowed);
        assert_eq!(authorize(Some(&session(Role::User)), Some(Role::Host)), Access::Forbidden);
        assert_eq!(authorize(Some(&session(Role::Admin)), Some(Role::Host)), Access::Allowed);
        assert_eq!(authorize(Some(&session(Role::Agency)), Some(Role::Agency)), Access::Allowed);
    }

    #[test]
    fn test_prefix_matching_is_segment_aware() {
        let policy = RoutePolicy::new(vec![("/host".into(), Role::Host)]);
        assert_eq!(policy.required_role("/host"), Some(Role::Host));
        assert_eq!(policy.required_role("/host/listings/4"), Some(Role::Host));
        assert_eq!(policy.required_role("/hosting-tips"), None);
        assert_eq!(policy.required_role("/"), None);
    }

    #[test]
    fn test_canonical_path_matches_file_service_view() {
        assert_eq!(canonical_path("/admin/x").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("/%61dmin/x").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("//admin//x/").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("/./admin/./x").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("/admin%2Fx").as_deref(), Some("/admin/x"));
        assert_eq!(canonical_path("").as_deref(), Some("/"));
        assert_eq!(canonical_path("/listings/../admin"), None);
        assert_eq!(canonical_path("/%2e%2e/admin"), None);
        assert_eq!(canonical_path("/a%00b"), None);
        assert_eq!(canonical_path("/%ff"), None);
    }

    #[test]
    fn test_encoded_prefix_is_still_protected() {
        let g = guard();
        let path = canonical_path("/%61dmin/secret.html").unwrap();
        assert!(g.is_protected(&path));
        assert_eq!(
            g.evaluate(&path, &path, None),
            GuardDecision::Redirect("/login?returnTo=%2Fadmin%2Fsecret.html".into())
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let g = guard();
        assert_eq!(g.policy.required_role("/host/public/faq"), Some(Role::Guest));
        assert_eq!(g.policy.required_role("/host/calendar"), Some(Role::Host));
    }

    #[test]
    fn test_missing_session_redirects_to_login_with_return_to() {
        let decision = guard().evaluate("/account", "/account?tab=trips", None);
        assert_eq!(
            decision,
            GuardDecision::Redirect("/login?returnTo=%2Faccount%3Ftab%3Dtrips".into())
        );
    }

    #[test]
    fn test_user_on_host_page_goes_home() {
        let s = session(Role::User);
        assert_eq!(
            guard().evaluate("/host/dashboard", "/host/dashboard", Some(&s)),
            GuardDecision::Redirect("/".into())
        );
    }

    #[test]
    fn test_allowed_and_public() {
        let s = session(Role::Host);
        assert_eq!(guard().evaluate("/host/dashboard", "/host/dashboard", Some(&s)), GuardDecision::Allow);
        assert_eq!(guard().evaluate("/listings", "/listings", None), GuardDecision::Public);
    }
}
