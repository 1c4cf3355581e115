use axum::http::{header, Extensions, HeaderMap};

use crate::models::user::Session;
use crate::services::{cookies::get_cookie, token::TokenValidator};

/// Per-request memo of the session lookup, stored in request extensions.
#[derive(Debug, Clone)]
struct ResolvedSession(Option<Session>);

/// Finds the caller's credential (cookie first, then bearer header) and turns
/// it into a [`Session`]. Never fails: a missing, malformed or expired
/// credential is simply "no session".
#[derive(Clone)]
pub struct SessionAccessor {
    validator: TokenValidator,
    cookie_name: String,
}

impl SessionAccessor {
    pub fn new(validator: TokenValidator, cookie_name: impl Into<String>) -> Self {
        Self {
            validator,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Raw credential carried by the request, if any. Not validated.
    pub fn credential(&self, headers: &HeaderMap) -> Option<String> {
        get_cookie(headers, &self.cookie_name).or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    }

    /// Resolve the session for this request. The first call decodes the
    /// credential; later calls within the same request reuse that answer.
    pub fn resolve(&self, extensions: &mut Extensions, headers: &HeaderMap) -> Option<Session> {
        if let Some(ResolvedSession(cached)) = extensions.get::<ResolvedSession>() {
            return cached.clone();
        }

        let session = self
            .credential(headers)
            .and_then(|token| self.validator.validate(&token).payload)
            .and_then(|payload| payload.into_session());

        extensions.insert(ResolvedSession(session.clone()));
        session
    }
}
