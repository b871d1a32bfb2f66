/*
 * Responsibility
 * - Config読み込み → 依存生成 (Valkey, JWT verifier, strategy registry) → Router 組み立て
 * - Middleware の適用 (認証ゲート / CORS / request-id / trace)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::middleware;
use crate::services::auth::{build_registry, build_verifier};
use crate::services::session::ValkeySessionStore;
use crate::services::upstream::{self, Upstream};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,edge_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,edge_gate=debug,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        // In production, prefer the default behavior (stderr) and let the server keep running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gateway auth gate in {:?} mode on {} -> {}",
        config.app_env,
        config.addr,
        config.upstream_url
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let settings = Arc::new(config.auth.clone());

    let store = ValkeySessionStore::new(&config.redis_url)
        .await
        .context("failed to connect to session store")?;
    tracing::info!(backend = store.backend_name(), "session store connected");

    let verifier = build_verifier(config).map_err(anyhow::Error::msg)?;

    // 重複・未登録のストラテジーはここで起動失敗にする
    let registry = build_registry(settings.clone(), verifier, Arc::new(store))
        .context("failed to register authentication strategies")?;
    tracing::info!(
        strategies = registry.len(),
        default_source = %settings.default_source,
        "strategies registered"
    );

    let upstream = Upstream::new(config.upstream_url.clone());

    Ok(AppState::new(Arc::new(registry), settings, upstream))
}

fn build_router(state: AppState, config: &Config) -> Router {
    async fn health() -> &'static str {
        "ok"
    }

    let proxied = middleware::auth::access::apply(
        Router::new().fallback(upstream::forward),
        state.clone(),
    );

    let router = Router::new()
        .route("/health", get(health))
        .merge(proxied)
        .with_state(state);

    let router = middleware::http::apply(
        router,
        config.request_timeout,
        config.request_body_limit,
    );

    middleware::cors::apply(
        router,
        config.app_env,
        &config.cors_allowed_origins,
        &config.auth,
    )
}
