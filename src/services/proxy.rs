//! Proxy service: forwards one browser request to one upstream and relays
//! the response.
//!
//! DESIGN
//! ======
//! The upstream timeout covers only the wait for response headers. Once the
//! upstream has answered, streaming bodies (SSE, plain text, chunked) are
//! relayed chunk-by-chunk with no deadline so long model generations are not
//! truncated. JSON bodies are parsed and re-emitted; anything else is relayed
//! as raw bytes with the upstream content type.
//!
//! Only `Content-Type` and `Authorization` cross the gateway. Cookies, hop
//! headers and browser fingerprinting headers stay on the browser side.

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use super::registry::{ServiceName, UnknownService};
use crate::error::{ErrorCode, error_response};

const DEFAULT_TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while forwarding a request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    UnknownService(#[from] UnknownService),

    /// No response headers within the configured timeout.
    #[error("upstream {service} did not respond within {}ms", .after.as_millis())]
    Timeout { service: ServiceName, after: Duration },

    /// Connection refused, DNS failure, reset, and similar.
    #[error("upstream {service} request failed: {message}")]
    Upstream { service: ServiceName, message: String },

    #[error("upstream {service} body read failed: {message}")]
    ReadBody { service: ServiceName, message: String },

    #[error("upstream {service} returned invalid JSON: {message}")]
    InvalidJson { service: ServiceName, message: String },

    #[error("response build failed: {0}")]
    BuildResponse(String),
}

impl ProxyError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownService(_) => StatusCode::NOT_FOUND,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } | Self::ReadBody { .. } | Self::InvalidJson { .. } | Self::BuildResponse(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the end user by the front-ends.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownService(UnknownService(name)) => format!("Servicio no encontrado: {name}"),
            Self::Timeout { service, .. } => format!("El servicio {service} no respondió a tiempo"),
            Self::Upstream { service, .. } => format!("No se pudo conectar con el servicio {service}"),
            Self::ReadBody { service, .. } | Self::InvalidJson { service, .. } => {
                format!("Respuesta inválida del servicio {service}")
            }
            Self::BuildResponse(_) => "Error interno del proxy".to_string(),
        }
    }
}

impl ErrorCode for ProxyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownService(_) => "E_UNKNOWN_SERVICE",
            Self::Timeout { .. } => "E_UPSTREAM_TIMEOUT",
            Self::Upstream { .. } | Self::ReadBody { .. } | Self::InvalidJson { .. } | Self::BuildResponse(_) => {
                "E_PROXY_FAILED"
            }
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Upstream { .. })
    }

    fn public_details(&self) -> Option<String> {
        match self {
            Self::Timeout { after, .. } => Some(format!("sin respuesta tras {}ms", after.as_millis())),
            Self::InvalidJson { .. } => Some("cuerpo JSON inválido".to_string()),
            Self::UnknownService(_) | Self::Upstream { .. } | Self::ReadBody { .. } | Self::BuildResponse(_) => None,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.user_message(), &self)
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// The parts of a browser request that are forwarded upstream.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Raw, still percent-encoded path after `/api/proxy/{service}/`.
    pub tail: String,
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub authorization: Option<HeaderValue>,
    pub body: Bytes,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(method: Method, tail: &str, query: Option<&str>, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            tail: tail.to_string(),
            query: query.map(str::to_string),
            content_type: headers.get(CONTENT_TYPE).cloned(),
            authorization: headers.get(AUTHORIZATION).cloned(),
            body,
        }
    }
}

/// Methods forwarded upstream. OPTIONS is answered locally.
#[must_use]
pub fn is_forwardable(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::POST | Method::PUT | Method::DELETE | Method::PATCH)
}

/// Only POST, PUT and PATCH carry a body upstream.
#[must_use]
pub fn forwards_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// `{base}/api/{tail}{?query}`.
#[must_use]
pub fn upstream_url(base_url: &str, tail: &str, query: Option<&str>) -> String {
    let tail = tail.trim_start_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{base_url}/api/{tail}?{q}"),
        None => format!("{base_url}/api/{tail}"),
    }
}

// =============================================================================
// RESPONSE CLASSIFICATION
// =============================================================================

/// How an upstream body is relayed back to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    Stream,
    Json,
    Text,
}

/// Classify by upstream headers. Streaming wins over JSON so chunked JSON
/// lines are never buffered.
#[must_use]
pub fn classify(headers: &HeaderMap) -> RelayMode {
    let content_type = header_lower(headers, CONTENT_TYPE.as_str());
    let transfer_encoding = header_lower(headers, TRANSFER_ENCODING.as_str());

    if content_type.contains("text/event-stream")
        || content_type.contains("text/plain")
        || transfer_encoding.contains("chunked")
    {
        RelayMode::Stream
    } else if content_type.contains("application/json") {
        RelayMode::Json
    } else {
        RelayMode::Text
    }
}

fn header_lower(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

// =============================================================================
// FORWARD
// =============================================================================

/// Send `req` to `service` at `base_url` and relay the answer.
///
/// # Errors
///
/// `Timeout` when no response headers arrive within `timeout`; the other
/// variants for transport, body, and JSON failures.
pub async fn forward(
    http: &reqwest::Client,
    service: ServiceName,
    base_url: &str,
    req: ProxyRequest,
    timeout: Duration,
) -> Result<Response, ProxyError> {
    let url = upstream_url(base_url, &req.tail, req.query.as_deref());
    tracing::debug!(%service, method = %req.method, upstream = %url, "forwarding request");

    let mut builder = http.request(req.method.clone(), &url);
    if let Some(content_type) = req.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    if let Some(authorization) = req.authorization {
        builder = builder.header(AUTHORIZATION, authorization);
    }
    if forwards_body(&req.method) {
        builder = builder.body(req.body);
    }

    let upstream = match tokio::time::timeout(timeout, builder.send()).await {
        Err(_) => return Err(ProxyError::Timeout { service, after: timeout }),
        Ok(Err(e)) if e.is_timeout() => return Err(ProxyError::Timeout { service, after: timeout }),
        Ok(Err(e)) => return Err(ProxyError::Upstream { service, message: e.to_string() }),
        Ok(Ok(response)) => response,
    };

    relay(service, upstream).await
}

async fn relay(service: ServiceName, upstream: reqwest::Response) -> Result<Response, ProxyError> {
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();
    let mode = classify(upstream.headers());
    tracing::debug!(%service, status = status.as_u16(), ?mode, "relaying upstream response");

    match mode {
        RelayMode::Stream => {
            let mut builder = Response::builder()
                .status(status)
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            if let Some(content_type) = content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            builder
                .body(Body::from_stream(upstream.bytes_stream()))
                .map_err(|e| ProxyError::BuildResponse(e.to_string()))
        }
        RelayMode::Json => {
            let bytes = read_body(service, upstream).await?;
            if bytes.is_empty() {
                return Ok(status.into_response());
            }
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| ProxyError::InvalidJson { service, message: e.to_string() })?;
            Ok((status, Json(value)).into_response())
        }
        RelayMode::Text => {
            let bytes = read_body(service, upstream).await?;
            let content_type = content_type.unwrap_or_else(|| HeaderValue::from_static(DEFAULT_TEXT_CONTENT_TYPE));
            Ok((status, [(CONTENT_TYPE, content_type)], bytes).into_response())
        }
    }
}

async fn read_body(service: ServiceName, upstream: reqwest::Response) -> Result<Bytes, ProxyError> {
    upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::ReadBody { service, message: e.to_string() })
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
