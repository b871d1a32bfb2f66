//! Session-token authentication for requests coming from the new ERP front end.
//!
//! token 抽出 → JWT 検証 → session (Valkey) 存在確認 → claims 必須項目確認
//! → identity header 付与 → 予約 header 除去

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::time::timeout;

use crate::error::AuthRejection;
use crate::services::auth::headers::{HeaderMutation, sanitize, write_identity};
use crate::services::auth::settings::AuthSettings;
use crate::services::auth::strategy::{AuthStrategy, RequestSource};
use crate::services::auth::token::{extract_token, redact};
use crate::services::auth::verifier::TokenVerifier;
use crate::services::session::{DeptAuthSource, SessionOracle};

pub struct NewErpStrategy {
    settings: Arc<AuthSettings>,
    verifier: Arc<dyn TokenVerifier>,
    sessions: Arc<dyn SessionOracle>,
    depts: Arc<dyn DeptAuthSource>,
}

impl NewErpStrategy {
    pub fn new(
        settings: Arc<AuthSettings>,
        verifier: Arc<dyn TokenVerifier>,
        sessions: Arc<dyn SessionOracle>,
        depts: Arc<dyn DeptAuthSource>,
    ) -> Self {
        Self {
            settings,
            verifier,
            sessions,
            depts,
        }
    }

    // Lookup failures and timeouts count as "no live session" (fail-closed).
    async fn session_is_live(&self, session_key: &str) -> bool {
        match timeout(self.settings.lookup_timeout, self.sessions.is_live(session_key)).await {
            Ok(Ok(live)) => live,
            Ok(Err(err)) => {
                tracing::warn!(error = ?err, session_key, "session lookup failed");
                false
            }
            Err(_) => {
                tracing::warn!(session_key, "session lookup timed out");
                false
            }
        }
    }

    // Missing data, lookup failures and timeouts all just omit the header.
    async fn dept_auth_list(&self, user_id: &str) -> Option<serde_json::Value> {
        let key = self.settings.dept_key(user_id);
        match timeout(self.settings.lookup_timeout, self.depts.dept_auth_list(&key)).await {
            Ok(Ok(list)) => list,
            Ok(Err(err)) => {
                tracing::warn!(error = ?err, key = %key, "dept auth list lookup failed");
                None
            }
            Err(_) => {
                tracing::warn!(key = %key, "dept auth list lookup timed out");
                None
            }
        }
    }
}

#[async_trait]
impl AuthStrategy for NewErpStrategy {
    fn source(&self) -> RequestSource {
        RequestSource::NewErp
    }

    async fn check(&self, headers: &HeaderMap) -> Result<HeaderMutation, AuthRejection> {
        let settings = &self.settings;

        let client_type = headers
            .get(&settings.client_type_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let Some(token) = extract_token(headers, &settings.token_header, &settings.token_prefix)
        else {
            tracing::debug!("no token supplied");
            return Err(AuthRejection::EmptyToken);
        };

        tracing::debug!(token = %redact(&token), client_type, "checking token");

        let claims = match self.verifier.verify(&token) {
            Ok(Some(claims)) => claims,
            Ok(None) => {
                tracing::warn!(token = %redact(&token), "token verified but carries no claims");
                return Err(AuthRejection::InvalidToken);
            }
            Err(err) => {
                tracing::warn!(error = %err, token = %redact(&token), "token verification failed");
                return Err(AuthRejection::InvalidToken);
            }
        };

        let session_key = settings.session_key(claims.user_id(), client_type);
        if !self.session_is_live(&session_key).await {
            tracing::info!(session_key = %session_key, "no live session");
            return Err(AuthRejection::SessionExpired);
        }

        if !claims.is_complete() {
            tracing::warn!(user_id = claims.user_id(), "claims missing user id or username");
            return Err(AuthRejection::IncompleteClaims);
        }

        let dept_auth_list = self.dept_auth_list(claims.user_id()).await;

        let mut mutation = HeaderMutation::new();
        write_identity(&mut mutation, &claims, dept_auth_list.as_ref());
        sanitize(&mut mutation, &settings.reserved_headers);

        tracing::debug!(user_id = claims.user_id(), "request authenticated");
        Ok(mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::claims::Claims;
    use crate::services::auth::headers::{
        DEPT_AUTH_LIST, DEPT_ID, USER_CODE, USER_ID, USERNAME,
    };
    use crate::services::auth::verifier::tests::{sign, sign_with, verifier};
    use crate::services::auth::verifier::VerifyError;
    use crate::services::cache::memory::{BrokenCache, DeptFailingCache, MemoryCache, SlowCache};
    use crate::services::cache::CacheClient;
    use crate::services::session::ValkeySessionStore;
    use axum::http::{HeaderValue, header::AUTHORIZATION};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn strategy_with<C: CacheClient>(cache: C) -> NewErpStrategy {
        let store = Arc::new(ValkeySessionStore::new_with_cache(Arc::new(cache)));
        NewErpStrategy::new(
            Arc::new(AuthSettings::default()),
            Arc::new(verifier()),
            store.clone(),
            store,
        )
    }

    fn request_headers(authorization: Option<&str>, client_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers.insert("clienttype", HeaderValue::from_str(client_type).unwrap());
        headers
    }

    fn alice_token() -> String {
        sign(&json!({"user_id": "u1", "username": "alice", "dept_id": "d9"}))
    }

    /// Counts calls, returns a canned result.
    struct CountingVerifier {
        calls: AtomicUsize,
        result: fn() -> Result<Option<Claims>, VerifyError>,
    }

    impl TokenVerifier for CountingVerifier {
        fn verify(&self, _token: &str) -> Result<Option<Claims>, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[tokio::test]
    async fn missing_token_is_rejected_without_any_lookup() {
        let cache = MemoryCache::new();
        let store = Arc::new(ValkeySessionStore::new_with_cache(Arc::new(cache.clone())));
        let counting = Arc::new(CountingVerifier {
            calls: AtomicUsize::new(0),
            result: || Ok(None),
        });
        let strategy = NewErpStrategy::new(
            Arc::new(AuthSettings::default()),
            counting.clone(),
            store.clone(),
            store,
        );

        for auth in [None, Some("   "), Some("Bearer ")] {
            let result = strategy.check(&request_headers(auth, "web")).await;
            assert_eq!(result, Err(AuthRejection::EmptyToken));
        }

        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_token_is_rejected_without_session_lookup() {
        let cache = MemoryCache::new().with("SESSION:u1web", "1");
        let strategy = strategy_with(cache.clone());

        let forged = sign_with(&json!({"user_id": "u1", "username": "alice"}), "wrong");
        for auth in ["Bearer not-a-jwt".to_string(), format!("Bearer {forged}")] {
            let result = strategy.check(&request_headers(Some(&auth), "web")).await;
            assert_eq!(result, Err(AuthRejection::InvalidToken));
        }

        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_claims_are_treated_as_invalid() {
        let cache = MemoryCache::new();
        let strategy = strategy_with(cache.clone());
        let token = sign(&json!({}));

        let result = strategy
            .check(&request_headers(Some(&format!("Bearer {token}")), "web"))
            .await;

        assert_eq!(result, Err(AuthRejection::InvalidToken));
        assert!(cache.calls().is_empty());
    }

    #[tokio::test]
    async fn absent_session_is_expired() {
        let cache = MemoryCache::new();
        let strategy = strategy_with(cache.clone());

        let result = strategy
            .check(&request_headers(Some(&format!("Bearer {}", alice_token())), "web"))
            .await;

        assert_eq!(result, Err(AuthRejection::SessionExpired));
        // only the session key was consulted; the dept list is never fetched
        assert_eq!(cache.calls(), vec!["SESSION:u1web".to_string()]);
    }

    #[tokio::test]
    async fn client_type_selects_the_session_bucket() {
        let cache = MemoryCache::new().with("SESSION:u1app", "1");
        let strategy = strategy_with(cache);
        let auth = format!("Bearer {}", alice_token());

        assert!(strategy.check(&request_headers(Some(&auth), "app")).await.is_ok());
        assert_eq!(
            strategy.check(&request_headers(Some(&auth), "web")).await,
            Err(AuthRejection::SessionExpired)
        );
    }

    #[tokio::test]
    async fn empty_client_type_is_its_own_bucket() {
        let cache = MemoryCache::new().with("SESSION:u1", "1");
        let strategy = strategy_with(cache);
        let mut headers = request_headers(Some(&format!("Bearer {}", alice_token())), "");
        headers.remove("clienttype");

        assert!(strategy.check(&headers).await.is_ok());
    }

    #[tokio::test]
    async fn session_backend_failure_is_fail_closed() {
        let strategy = strategy_with(BrokenCache);

        let result = strategy
            .check(&request_headers(Some(&format!("Bearer {}", alice_token())), "web"))
            .await;

        assert_eq!(result, Err(AuthRejection::SessionExpired));
    }

    #[tokio::test]
    async fn session_lookup_timeout_is_fail_closed() {
        let store = Arc::new(ValkeySessionStore::new_with_cache(Arc::new(SlowCache {
            delay: Duration::from_secs(5),
        })));
        let settings = AuthSettings {
            lookup_timeout: Duration::from_millis(20),
            ..AuthSettings::default()
        };
        let strategy =
            NewErpStrategy::new(Arc::new(settings), Arc::new(verifier()), store.clone(), store);

        let result = strategy
            .check(&request_headers(Some(&format!("Bearer {}", alice_token())), "web"))
            .await;

        assert_eq!(result, Err(AuthRejection::SessionExpired));
    }

    #[tokio::test]
    async fn missing_username_is_incomplete() {
        let cache = MemoryCache::new().with("SESSION:u1web", "1");
        let strategy = strategy_with(cache);
        let token = sign(&json!({"user_id": "u1", "username": ""}));

        let result = strategy
            .check(&request_headers(Some(&format!("Bearer {token}")), "web"))
            .await;

        assert_eq!(result, Err(AuthRejection::IncompleteClaims));
    }

    #[tokio::test]
    async fn live_session_produces_identity_headers() {
        let cache = MemoryCache::new().with("SESSION:u1web", "1");
        let strategy = strategy_with(cache);

        let mut headers = request_headers(Some(&format!("Bearer {}", alice_token())), "web");
        headers.insert("request-source", HeaderValue::from_static("NEW_ERP"));

        let mutation = strategy.check(&headers).await.unwrap();
        mutation.apply(&mut headers);

        assert_eq!(headers.get(USER_ID).unwrap(), "u1");
        assert_eq!(headers.get(USERNAME).unwrap(), "alice");
        assert_eq!(headers.get(DEPT_ID).unwrap(), "d9");
        assert!(headers.get(USER_CODE).is_none());
        assert!(headers.get(DEPT_AUTH_LIST).is_none());
        assert!(headers.get("request-source").is_none());
    }

    #[tokio::test]
    async fn cached_dept_list_is_relayed() {
        let cache = MemoryCache::new()
            .with("SESSION:u1web", "1")
            .with("new_erp:dept_auth_list:u1", r#"["d1","d2"]"#);
        let strategy = strategy_with(cache);

        let mut headers = request_headers(Some(&format!("Bearer {}", alice_token())), "web");
        strategy.check(&headers).await.unwrap().apply(&mut headers);

        let raw = headers.get(DEPT_AUTH_LIST).unwrap().to_str().unwrap();
        assert_eq!(urlencoding::decode(raw).unwrap(), r#"["d1","d2"]"#);
    }

    #[tokio::test]
    async fn dept_list_backend_failure_omits_the_header() {
        let strategy = strategy_with(DeptFailingCache::default());

        let mut headers = request_headers(Some(&format!("Bearer {}", alice_token())), "web");
        strategy.check(&headers).await.unwrap().apply(&mut headers);

        assert_eq!(headers.get(USER_ID).unwrap(), "u1");
        assert!(headers.get(DEPT_AUTH_LIST).is_none());
    }

    #[tokio::test]
    async fn dept_list_timeout_omits_the_header() {
        let store = Arc::new(ValkeySessionStore::new_with_cache(Arc::new(DeptFailingCache {
            stall: Some(Duration::from_secs(5)),
        })));
        let settings = AuthSettings {
            lookup_timeout: Duration::from_millis(20),
            ..AuthSettings::default()
        };
        let strategy =
            NewErpStrategy::new(Arc::new(settings), Arc::new(verifier()), store.clone(), store);

        let mut headers = request_headers(Some(&format!("Bearer {}", alice_token())), "web");
        strategy.check(&headers).await.unwrap().apply(&mut headers);

        assert_eq!(headers.get(USER_ID).unwrap(), "u1");
        assert!(headers.get(DEPT_AUTH_LIST).is_none());
    }

    #[tokio::test]
    async fn same_request_checked_twice_yields_same_headers() {
        let cache = MemoryCache::new().with("SESSION:u1web", "1");
        let strategy = strategy_with(cache);
        let original = request_headers(Some(&format!("Bearer {}", alice_token())), "web");

        let mut first = original.clone();
        strategy.check(&original).await.unwrap().apply(&mut first);
        let mut second = original.clone();
        strategy.check(&original).await.unwrap().apply(&mut second);

        assert_eq!(first, second);
    }
}
