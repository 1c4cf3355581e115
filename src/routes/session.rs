use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use crate::{
    middleware::auth::MaybeSession,
    models::user::{SessionResponse, TokenResponse},
    services::token::expires_within,
    AppState,
};

/// GET /auth/session
/// Mirrors the server's view of the session for client code. An absent or
/// expired credential yields `{ "user": null }`, never an error.
pub async fn get_session(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Json<SessionResponse> {
    let response = match session {
        Some(session) => {
            let expires_at = session.expires_at;
            let expiring_soon = expires_within(
                expires_at.timestamp(),
                state.config.refresh_buffer_seconds,
                Utc::now().timestamp(),
            );
            SessionResponse {
                user: Some(session.user),
                expires_at: Some(expires_at),
                expiring_soon: Some(expiring_soon),
            }
        }
        None => SessionResponse {
            user: None,
            expires_at: None,
            expiring_soon: None,
        },
    };
    Json(response)
}

/// GET /auth/token
/// Hands the bearer credential to client code for API calls. Only a
/// currently valid credential is returned.
pub async fn get_token(State(state): State<AppState>, headers: HeaderMap) -> Json<TokenResponse> {
    let token = state
        .sessions
        .credential(&headers)
        .filter(|token| state.sessions.validator().validate(token).valid);
    Json(TokenResponse { token })
}
