/*
 * Responsibility
 * - 認証済みリクエストを upstream へ転送する (method / path / query / header / body)
 * - upstream のレスポンスをそのまま返す
 */
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, State},
    http::{HeaderMap, HeaderName, Request, StatusCode, header},
    response::Response,
};
use url::Url;

use crate::error::AppError;
use crate::state::AppState;

// Connection-scoped headers must not be relayed (RFC 9110 7.6.1).
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("keep-alive"),
    header::TE,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Clone, Debug)]
pub struct Upstream {
    client: reqwest::Client,
    base: Url,
}

impl Upstream {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    /// Target URL: upstream origin + incoming path and query.
    ///
    /// Dot segments (`..`, `%2e%2e`) are resolved here.
    pub fn target(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }

    /// The path upstream will actually receive for `path`.
    pub fn forwarded_path(&self, path: &str) -> String {
        self.target(path, None).path().to_string()
    }

    pub async fn forward(&self, req: Request<Body>) -> Result<Response, AppError> {
        let method = req.method().clone();
        let target = self.target(req.uri().path(), req.uri().query());

        let mut headers = relay_headers(req.headers());
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::PROXY_AUTHORIZATION);

        // The body limit itself is enforced by the HTTP layer stack.
        let body = Bytes::from_request(req, &()).await.map_err(|rejection| {
            tracing::warn!(error = %rejection, "failed to read request body");
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::BadGateway
            }
        })?;

        let resp = self
            .client
            .request(method, target.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, target = %target, "upstream request failed");
                AppError::BadGateway
            })?;

        let status = resp.status();
        let mut resp_headers = relay_headers(resp.headers());
        resp_headers.remove(header::CONTENT_LENGTH);

        let bytes = resp.bytes().await.map_err(|err| {
            tracing::warn!(error = %err, target = %target, "failed to read upstream response");
            AppError::BadGateway
        })?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = resp_headers;

        Ok(response)
    }
}

fn relay_headers(headers: &HeaderMap) -> HeaderMap {
    // Connection may name further headers that only apply to this hop.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = headers.clone();
    for name in HOP_BY_HOP.into_iter().chain(named) {
        out.remove(name);
    }
    out
}

/// Fallback handler: everything the gate let through goes upstream.
pub async fn forward(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    state.upstream.forward(req).await
}
