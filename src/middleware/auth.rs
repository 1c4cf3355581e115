use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::models::user::Session;
use crate::AppState;

/// The caller's session, if any. Never rejects: handlers branch on `None`
/// instead of catching errors. Shares the per-request lookup with the route
/// guard, so both see the same answer.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Session>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = state.sessions.resolve(&mut parts.extensions, &parts.headers);
        Ok(MaybeSession(session))
    }
}
