//! Header names, key namespaces and timeouts used by authentication strategies.

use std::time::Duration;

use axum::http::HeaderName;

use crate::services::auth::strategy::RequestSource;

/// Settings shared by every strategy and by the gate middleware.
///
/// Built once from `Config` at startup; strategies hold it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Header carrying the bearer token.
    pub token_header: HeaderName,
    /// Scheme prefix stripped (first occurrence only) from the token header value.
    pub token_prefix: String,
    /// Header carrying the client type discriminator (web / app / ...).
    pub client_type_header: HeaderName,
    /// Header used to classify the request source.
    pub request_source_header: HeaderName,
    /// Source used when the classifier header is absent or unrecognised.
    pub default_source: RequestSource,
    /// Session key = `session_namespace + user_id + client_type`
    pub session_namespace: String,
    /// Dept auth list key = `dept_namespace + user_id`
    pub dept_namespace: String,
    /// Headers only trusted internal components may set.
    pub reserved_headers: Vec<HeaderName>,
    /// Path patterns that skip the authentication check.
    pub whitelist: Vec<String>,
    /// Upper bound for a single session store round trip.
    pub lookup_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_header: axum::http::header::AUTHORIZATION,
            token_prefix: "Bearer ".to_string(),
            client_type_header: HeaderName::from_static("clienttype"),
            request_source_header: HeaderName::from_static("request-source"),
            default_source: RequestSource::NewErp,
            session_namespace: "SESSION:".to_string(),
            dept_namespace: "new_erp:dept_auth_list:".to_string(),
            reserved_headers: vec![
                HeaderName::from_static("request-source"),
                HeaderName::from_static("from-source"),
            ],
            whitelist: Vec::new(),
            lookup_timeout: Duration::from_millis(500),
        }
    }
}

impl AuthSettings {
    pub fn session_key(&self, user_id: &str, client_type: &str) -> String {
        format!("{}{}{}", self.session_namespace, user_id, client_type)
    }

    pub fn dept_key(&self, user_id: &str) -> String {
        format!("{}{}", self.dept_namespace, user_id)
    }
}
