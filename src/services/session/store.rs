use std::{future::Future, pin::Pin};

use crate::services::cache::CacheError;

/// Session liveness check result:
/// - `Ok(true)`: a live session exists for the key
/// - `Ok(false)`: expired, revoked (logout) or never established
/// - `Err(_)`: store failure (caller treats as expired, fail-closed)
pub trait SessionOracle: Send + Sync {
    fn is_live<'a>(
        &'a self,
        session_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, SessionError>> + Send + 'a>>;
}

/// Cached department authorization list for a user.
///
/// - `Ok(Some(_))`: relayed as-is (opaque JSON)
/// - `Ok(None)`: nothing cached, header is omitted
/// - `Err(_)`: store failure, header is omitted
pub trait DeptAuthSource: Send + Sync {
    fn dept_auth_list<'a>(
        &'a self,
        dept_key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>, SessionError>> + Send + 'a>>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}
