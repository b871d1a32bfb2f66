//! 認証ゲート: request source でストラテジーを選び、token/session を検証 → identity header を付与
//!
//! - whitelist のパスは認証をスキップ (予約 header / identity header の除去だけ行う)
//! - whitelist 判定は upstream に転送されるパス (dot segment 解決済み) で行う
//! - 拒否時は 401 を返し、upstream には渡さない
//! - header の書き換えは検証がすべて通った後に一度だけ適用する

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::services::auth::AuthSettings;
use crate::services::auth::headers::{HeaderMutation, clear_identity, sanitize};
use crate::services::auth::strategy::RequestSource;
use crate::state::AppState;

/// Apply the authentication gate to every route (and fallback) of `router`.
///
/// 例：
/// ```ignore
/// let proxied = Router::new().fallback(upstream::forward);
/// let proxied = middleware::auth::access::apply(proxied, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

/// Request source from the classifier header; absent or unknown values use the default.
pub fn classify(headers: &HeaderMap, settings: &AuthSettings) -> RequestSource {
    let Some(raw) = headers
        .get(&settings.request_source_header)
        .and_then(|v| v.to_str().ok())
    else {
        return settings.default_source;
    };

    raw.parse().unwrap_or_else(|err| {
        tracing::debug!(error = %err, "falling back to default request source");
        settings.default_source
    })
}

async fn gate_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let settings = &state.settings;

    // `/code/../system` must be judged as the `/system` upstream will see
    let path = state.upstream.forwarded_path(req.uri().path());
    if state.whitelist.matches(&path) {
        let mut mutation = HeaderMutation::new();
        clear_identity(&mut mutation);
        sanitize(&mut mutation, &settings.reserved_headers);
        mutation.apply(req.headers_mut());
        return next.run(req).await;
    }

    let source = classify(req.headers(), settings);

    // registry は起動時に検証済み。ここで見つからないのは設定ミス
    let strategy = match state.registry.get(source) {
        Ok(strategy) => strategy.clone(),
        Err(err) => {
            tracing::error!(error = %err, "no strategy for request source");
            return AppError::Internal.into_response();
        }
    };

    match strategy.check(req.headers()).await {
        Ok(mutation) => {
            mutation.apply(req.headers_mut());
            next.run(req).await
        }
        Err(rejection) => {
            tracing::info!(
                reason = rejection.code(),
                source = %source,
                path = %path,
                "request rejected"
            );
            rejection.into_response()
        }
    }
}
