//! In-memory `CacheClient` for tests.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Keys looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, key: &str) {
        self.calls.lock().unwrap().push(key.to_string());
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        self.record(key);
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.record(key);
        Ok(self.entries.lock().unwrap().contains_key(key))
    }
}

/// Every command fails as if the backend were unreachable.
#[derive(Clone, Default)]
pub struct BrokenCache;

#[async_trait]
impl CacheClient for BrokenCache {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get_string(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::BackendConnection("connection refused".to_string()))
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::BackendConnection("connection refused".to_string()))
    }
}

/// Every lookup answers, but only after `delay`.
#[derive(Clone)]
pub struct SlowCache {
    pub delay: Duration,
}

#[async_trait]
impl CacheClient for SlowCache {
    fn backend_name(&self) -> &'static str {
        "slow"
    }

    async fn get_string(&self, _key: &str) -> CacheResult<Option<String>> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        tokio::time::sleep(self.delay).await;
        Ok(true)
    }
}

/// Every session is live; the dept auth list `GET` errors, or stalls for `stall` when set.
#[derive(Clone, Default)]
pub struct DeptFailingCache {
    pub stall: Option<Duration>,
}

#[async_trait]
impl CacheClient for DeptFailingCache {
    fn backend_name(&self) -> &'static str {
        "dept-failing"
    }

    async fn get_string(&self, _key: &str) -> CacheResult<Option<String>> {
        match self.stall {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Some(r#"["d1"]"#.to_string()))
            }
            None => Err(CacheError::BackendCommand("READONLY".to_string())),
        }
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Ok(true)
    }
}
