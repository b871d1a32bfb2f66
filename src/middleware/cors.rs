//! CORS policy for browser clients of the gateway.
//!
//! Note:
//! - CORS is enforced by browsers. Native apps and server-to-server calls are not
//!   restricted by CORS.
//! - Preflight (OPTIONS) is answered here, before the authentication gate sees it.
//!
//! Policy:
//! - Development: permissive (Allow-Origin: *), WITHOUT credentials.
//! - Production: allowlist origins from Config (comma-separated env var), WITHOUT credentials.
//! - The token header and the client type header must be allowed, or browsers cannot send them.

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppEnv;
use crate::services::auth::AuthSettings;

/// Apply CORS policy to the given Router.
///
/// IMPORTANT:
/// - Do not combine wildcard origin (`Any`) with `allow_credentials(true)`.
pub fn apply(
    router: Router,
    app_env: AppEnv,
    allowed_origins: &[String],
    settings: &AuthSettings,
) -> Router {
    router.layer(layer(app_env, allowed_origins, settings))
}

fn layer(app_env: AppEnv, allowed_origins: &[String], settings: &AuthSettings) -> CorsLayer {
    let cors = if app_env.is_production() {
        // Production: allow only configured origins (exact match).
        // An empty allowlist allows none (no CORS headers).
        let allowed: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
            allowed.iter().any(|v| v == origin)
        });

        CorsLayer::new().allow_origin(allow_origin)
    } else {
        // Development: permissive (no credentials)
        CorsLayer::new().allow_origin(Any)
    };

    let mut allow_headers = vec![
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        HeaderName::from_static("x-request-id"),
        settings.token_header.clone(),
        settings.client_type_header.clone(),
        settings.request_source_header.clone(),
    ];
    allow_headers.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    allow_headers.dedup();

    cors.allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers(allow_headers)
    .max_age(std::time::Duration::from_secs(60 * 10))
}
