/*
 * Responsibility
 * - 認証ゲートの拒否理由 (AuthRejection) と、それ以外の ApiError (AppError)
 * - IntoResponse 実装 (HTTP status / JSON error body)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Per-request outcomes that halt a request with 401.
///
/// These are expected results of the authentication check, never process faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    /// caller sent no credential
    #[error("token must not be empty")]
    EmptyToken,
    /// malformed, expired, bad signature, verifier failure or empty claims
    #[error("invalid token, please log in again")]
    InvalidToken,
    /// no live session for the token, including session lookup failures
    #[error("login session has expired")]
    SessionExpired,
    /// verified claims lack user id or username
    #[error("token verification failed")]
    IncompleteClaims,
}

impl AuthRejection {
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::EmptyToken => "EMPTY_TOKEN",
            AuthRejection::InvalidToken => "INVALID_TOKEN",
            AuthRejection::SessionExpired => "SESSION_EXPIRED",
            AuthRejection::IncompleteClaims => "INCOMPLETE_CLAIMS",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("upstream unavailable")]
    BadGateway,
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body too large".into(),
            ),
            AppError::BadGateway => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "upstream unavailable".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
