/*
 * Responsibility
 * - 認証ストラテジーの共通インターフェース (AuthStrategy)
 * - リクエスト元 (RequestSource) ごとにストラテジーを切り替える
 */
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::error::AuthRejection;
use crate::services::auth::headers::HeaderMutation;

pub mod new_erp;
pub mod registry;

pub use new_erp::NewErpStrategy;
pub use registry::{StrategyError, StrategyRegistry};

/// Which client system a request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestSource {
    NewErp,
}

impl RequestSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestSource::NewErp => "NEW_ERP",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for RequestSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW_ERP" | "NEWERP" => Ok(RequestSource::NewErp),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

/// One way of authenticating requests from a given source.
///
/// `check` only reads the incoming headers. On success it returns the header
/// changes to apply before forwarding; the caller applies them.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// The request source this strategy handles.
    fn source(&self) -> RequestSource;

    async fn check(&self, headers: &HeaderMap) -> Result<HeaderMutation, AuthRejection>;
}
