/// Factory: build the token verifier and the strategy registry from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::settings::AuthSettings;
use crate::services::auth::strategy::{
    AuthStrategy, NewErpStrategy, StrategyError, StrategyRegistry,
};
use crate::services::auth::verifier::{JwtVerifier, TokenVerifier};
use crate::services::cache::CacheClient;
use crate::services::session::ValkeySessionStore;

pub fn build_verifier(config: &Config) -> Result<Arc<dyn TokenVerifier>, String> {
    let verifier = JwtVerifier::new(
        &config.verification_key,
        config.auth_issuer.as_deref(),
        config.auth_audience.as_deref(),
        config.access_token_leeway_seconds,
    )?;

    Ok(Arc::new(verifier))
}

/// Register every known strategy, then make sure the default source can be served.
pub fn build_registry<C: CacheClient>(
    settings: Arc<AuthSettings>,
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<ValkeySessionStore<C>>,
) -> Result<StrategyRegistry, StrategyError> {
    let strategies: Vec<Arc<dyn AuthStrategy>> = vec![Arc::new(NewErpStrategy::new(
        settings.clone(),
        verifier,
        store.clone(),
        store,
    ))];

    let registry = StrategyRegistry::build(strategies)?;
    registry.ensure_registered(&[settings.default_source])?;

    Ok(registry)
}
