use std::{future::Future, pin::Pin, sync::Arc};

use crate::services::{
    cache::{CacheClient, ValkeyClient},
    session::store::{DeptAuthSource, SessionError, SessionOracle},
};

/// Valkey-backed session store (Redis protocol), read-only.
///
/// Keys are built by the strategy; this type only asks the backend.
#[derive(Clone)]
pub struct ValkeySessionStore<C: CacheClient> {
    cache: Arc<C>,
}

impl ValkeySessionStore<ValkeyClient> {
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        let client = ValkeyClient::new(redis_url).await?;

        Ok(Self {
            cache: Arc::new(client),
        })
    }
}

impl<C: CacheClient> ValkeySessionStore<C> {
    pub fn new_with_cache(cache: Arc<C>) -> Self {
        Self { cache }
    }

    pub fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }
}

impl<C: CacheClient> SessionOracle for ValkeySessionStore<C> {
    fn is_live<'a>(
        &'a self,
        session_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, SessionError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.cache.exists(session_key).await?) })
    }
}

impl<C: CacheClient> DeptAuthSource for ValkeySessionStore<C> {
    fn dept_auth_list<'a>(
        &'a self,
        dept_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, SessionError>> + Send + 'a>>
    {
        Box::pin(async move {
            let Some(raw) = self.cache.get_string(dept_key).await? else {
                return Ok(None);
            };

            Ok(decode_cached_value(&raw))
        })
    }
}

// The login service writes the list as JSON; anything else is relayed as a plain string.
fn decode_cached_value(raw: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::Value::String(raw.to_string())),
    }
}
