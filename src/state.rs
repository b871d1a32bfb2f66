/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: registry: StrategyRegistry, settings: AuthSettings, upstream: Upstream
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 起動後は read-only
 */
use std::sync::Arc;

use crate::middleware::auth::Whitelist;
use crate::services::{
    auth::{AuthSettings, StrategyRegistry},
    upstream::Upstream,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StrategyRegistry>,
    pub settings: Arc<AuthSettings>,
    pub whitelist: Arc<Whitelist>,
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        settings: Arc<AuthSettings>,
        upstream: Upstream,
    ) -> Self {
        let whitelist = Arc::new(Whitelist::new(&settings.whitelist));

        Self {
            registry,
            settings,
            whitelist,
            upstream,
        }
    }
}
