use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::AppError;
use crate::services::{
    cookies::get_cookie,
    csrf::{CSRF_COOKIE, CSRF_FIELD, CSRF_HEADER},
    metrics::CSRF_REJECTIONS_COUNTER,
};
use crate::AppState;

/// Largest body buffered while looking for a form-field token.
const MAX_CSRF_BODY: usize = 64 * 1024;

/// Rejects state-changing requests whose CSRF token (header, or
/// `csrf_token` body field) does not equal the `csrf_token` cookie.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let method = request.method();
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let cookie = get_cookie(request.headers(), CSRF_COOKIE);
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (request, supplied) = match header_token {
        Some(token) => (request, Some(token)),
        None => token_from_body(request).await?,
    };

    if let Err(rejection) = state.csrf.verify(cookie.as_deref(), supplied.as_deref()) {
        CSRF_REJECTIONS_COUNTER.with_label_values(&[rejection.reason()]).inc();
        tracing::warn!("CSRF check failed for {} {}: {}", request.method(), request.uri().path(), rejection);
        return Err(rejection.into());
    }

    Ok(next.run(request).await)
}

/// Buffers a form or JSON body, pulls out the token field and hands back an
/// equivalent request for the handler.
async fn token_from_body(request: Request) -> Result<(Request, Option<String>), AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");
    let is_json = content_type.starts_with("application/json");
    if !is_form && !is_json {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_CSRF_BODY)
        .await
        .map_err(|_| AppError::BadRequest("Request body too large".into()))?;

    let token = if is_form {
        form_urlencoded::parse(&bytes)
            .find(|(key, _)| key == CSRF_FIELD)
            .map(|(_, value)| value.into_owned())
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|v| v.get(CSRF_FIELD).and_then(Value::as_str).map(str::to_string))
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}
