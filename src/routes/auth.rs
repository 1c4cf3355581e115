use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{middleware::auth::MaybeSession, services::cookies::clear_cookie, AppState};

/// POST /auth/logout (CSRF-protected)
/// Drops the access and refresh cookies. Revoking the refresh token itself is
/// the identity backend's job.
pub async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> Response {
    if let Some(session) = &session {
        tracing::info!("logout for session {}", session.session_id);
    }

    let secure = state.config.cookie_secure;
    (
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(&state.config.session_cookie_name, secure)),
            (header::SET_COOKIE, clear_cookie(&state.config.refresh_cookie_name, secure)),
        ]),
        Json(json!({ "success": true })),
    )
        .into_response()
}
