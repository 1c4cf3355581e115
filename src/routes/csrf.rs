use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// GET /auth/csrf
/// Issues a fresh double-submit token: the cookie is set on the response and
/// the same value is returned for the next state-changing request.
pub async fn issue_csrf_token(State(state): State<AppState>) -> Response {
    let issued = state.csrf.issue();
    (
        [(header::SET_COOKIE, issued.set_cookie)],
        Json(json!({ "csrfToken": issued.token })),
    )
        .into_response()
}
