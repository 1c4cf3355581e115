use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    error::AppError,
    middleware::guard::RETURN_TO_PARAM,
    services::{
        metrics::OAUTH_INITIATIONS_COUNTER,
        oauth::{OAuthError, Provider},
        redirect::{sanitize_return_to, with_query},
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct InitiateQuery {
    pub redirect: Option<String>,
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// GET /auth/oauth/{provider}?redirect=/somewhere
/// Sends the browser to the provider with a PKCE challenge. Unknown providers
/// are a 400; a provider that cannot be set up sends the user back to the
/// login page with an `error` message.
pub async fn initiate_oauth(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<InitiateQuery>,
) -> Result<Response, AppError> {
    let provider: Provider = provider.parse().map_err(|e: OAuthError| {
        OAUTH_INITIATIONS_COUNTER.with_label_values(&["unsupported", "rejected"]).inc();
        AppError::BadRequest(e.to_string())
    })?;

    let return_to = query.redirect.as_deref().or(query.return_to.as_deref());

    match state.oauth.initiate(provider, return_to) {
        Ok(initiation) => {
            OAUTH_INITIATIONS_COUNTER
                .with_label_values(&[provider.as_str(), "redirected"])
                .inc();
            tracing::info!("OAuth sign-in started with {}", provider.as_str());

            let cookies: Vec<(HeaderName, String)> = initiation
                .set_cookies
                .into_iter()
                .map(|c| (header::SET_COOKIE, c))
                .collect();
            Ok((
                StatusCode::FOUND,
                AppendHeaders(cookies),
                [(header::LOCATION, initiation.redirect_url)],
            )
                .into_response())
        }
        Err(e) => {
            OAUTH_INITIATIONS_COUNTER
                .with_label_values(&[provider.as_str(), "failed"])
                .inc();
            tracing::warn!("OAuth initiation failed for {}: {}", provider.as_str(), e);

            let mut target = with_query(&state.config.login_path, "error", &e.to_string());
            if let Some(dest) = sanitize_return_to(return_to) {
                target = with_query(&target, RETURN_TO_PARAM, &dest);
            }
            Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
        }
    }
}
