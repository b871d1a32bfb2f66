/*
 * Responsibility
 * - 環境変数や設定の読み込み (REDIS_URL, UPSTREAM_URL, JWT 鍵, header 名など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;
use url::Url;

use crate::services::auth::settings::AuthSettings;
use crate::services::auth::strategy::RequestSource;
use crate::services::auth::verifier::VerificationKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub redis_url: String,
    pub upstream_url: Url,
    pub request_timeout: Duration,
    pub request_body_limit: usize,

    pub verification_key: VerificationKey,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub access_token_leeway_seconds: u64,

    pub auth: AuthSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = csv_env("CORS_ALLOWED_ORIGINS");

        let redis_url = std::env::var("REDIS_URL").map_err(|_| ConfigError::Missing("REDIS_URL"))?;

        let upstream_url = std::env::var("UPSTREAM_URL")
            .map_err(|_| ConfigError::Missing("UPSTREAM_URL"))?;
        let upstream_url =
            Url::parse(&upstream_url).map_err(|_| ConfigError::Invalid("UPSTREAM_URL"))?;

        let request_timeout = Duration::from_secs(
            std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let request_body_limit = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);

        // Ed25519 公開鍵があれば優先、なければ HS512 の共有シークレット
        let verification_key = match (
            std::env::var("ACCESS_JWT_PUBLIC_KEY_PEM").ok(),
            std::env::var("JWT_SECRET").ok(),
        ) {
            (Some(pem), _) if !pem.trim().is_empty() => {
                VerificationKey::Ed25519Pem(pem.replace("\\n", "\n"))
            }
            (_, Some(secret)) if !secret.is_empty() => VerificationKey::Secret(secret),
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let auth_issuer = non_empty_env("AUTH_ISSUER");
        let auth_audience = non_empty_env("AUTH_AUDIENCE");

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let auth = auth_settings_from_env()?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            redis_url,
            upstream_url,
            request_timeout,
            request_body_limit,
            verification_key,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            auth,
        })
    }
}

fn auth_settings_from_env() -> Result<AuthSettings, ConfigError> {
    let defaults = AuthSettings::default();

    let token_header = header_env("TOKEN_HEADER", defaults.token_header)?;
    let token_prefix = std::env::var("TOKEN_PREFIX").unwrap_or(defaults.token_prefix);
    let client_type_header = header_env("CLIENT_TYPE_HEADER", defaults.client_type_header)?;
    let request_source_header =
        header_env("REQUEST_SOURCE_HEADER", defaults.request_source_header)?;

    let default_source = match non_empty_env("DEFAULT_REQUEST_SOURCE") {
        Some(raw) => raw
            .parse::<RequestSource>()
            .map_err(|_| ConfigError::Invalid("DEFAULT_REQUEST_SOURCE"))?,
        None => defaults.default_source,
    };

    let session_namespace =
        std::env::var("SESSION_NAMESPACE").unwrap_or(defaults.session_namespace);
    let dept_namespace = std::env::var("DEPT_NAMESPACE").unwrap_or(defaults.dept_namespace);

    let reserved_headers = match std::env::var("RESERVED_HEADERS") {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                HeaderName::from_bytes(s.as_bytes())
                    .map_err(|_| ConfigError::Invalid("RESERVED_HEADERS"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Err(_) => defaults.reserved_headers,
    };

    let whitelist = csv_env("AUTH_WHITELIST");

    let lookup_timeout = std::env::var("SESSION_LOOKUP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(defaults.lookup_timeout);

    Ok(AuthSettings {
        token_header,
        token_prefix,
        client_type_header,
        request_source_header,
        default_source,
        session_namespace,
        dept_namespace,
        reserved_headers,
        whitelist,
        lookup_timeout,
    })
}

fn header_env(key: &'static str, default: HeaderName) -> Result<HeaderName, ConfigError> {
    match non_empty_env(key) {
        Some(raw) => HeaderName::from_bytes(raw.as_bytes()).map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn csv_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
}
