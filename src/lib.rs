pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

use config::Config;
use middleware::guard::RouteGuard;
use services::{csrf::CsrfGuard, oauth::OAuthInitiator, session::SessionAccessor, token::TokenValidator};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionAccessor,
    pub guard: RouteGuard,
    pub csrf: CsrfGuard,
    pub oauth: OAuthInitiator,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let validator = TokenValidator::new(&config.jwt_secret, config.jwt_issuer.as_deref());
        Self {
            sessions: SessionAccessor::new(validator, config.session_cookie_name.clone()),
            guard: RouteGuard::from_config(&config),
            csrf: CsrfGuard::new(config.csrf_max_age_seconds, config.cookie_secure),
            oauth: OAuthInitiator::from_config(&config),
            config: Arc::new(config),
        }
    }
}

/// Build the router: auth endpoints, then the front-end behind the route guard.
pub fn create_app(state: AppState) -> Router {
    // Browser origins: the configured app plus localhost for development.
    let base = state.config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin.to_str().is_ok_and(|o| is_allowed_origin(o, &base))
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(services::csrf::CSRF_HEADER),
        ])
        .allow_origin(cors_origin)
        .allow_credentials(true);

    // State-changing routes
    let csrf_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .layer(from_fn_with_state(state.clone(), middleware::csrf::require_csrf));

    let open_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .route("/auth/session", get(routes::session::get_session))
        .route("/auth/token", get(routes::session::get_token))
        .route("/auth/csrf", get(routes::csrf::issue_csrf_token))
        .route("/auth/oauth/{provider}", get(routes::oauth::initiate_oauth));

    Router::new()
        .merge(csrf_routes)
        .merge(open_routes)
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(from_fn_with_state(state.clone(), middleware::guard::route_guard))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Credentialed CORS is limited to the app's own origin and local development
/// hosts. Hosts are compared exactly, on any port.
fn is_allowed_origin(origin: &str, app_base_url: &str) -> bool {
    let Ok(origin) = Url::parse(origin) else {
        return false;
    };
    if Url::parse(app_base_url).is_ok_and(|base| base.origin() == origin.origin()) {
        return true;
    }
    origin.scheme() == "http" && matches!(origin.host_str(), Some("localhost") | Some("127.0.0.1"))
}
