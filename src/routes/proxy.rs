//! Proxy routes: `/api/proxy/{service}/{*path}` for every method.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::services::proxy::{self as proxy_svc, ProxyError, ProxyRequest};
use crate::services::registry::ServiceName;
use crate::state::AppState;

const PROXY_PREFIX: &str = "/api/proxy/";

/// Split `/api/proxy/{service}/{tail}` into its raw service and tail parts.
pub(crate) fn split_proxy_path(path: &str) -> Option<(&str, &str)> {
    path.strip_prefix(PROXY_PREFIX)?.split_once('/')
}

/// `ANY /api/proxy/{service}/{*path}`: forward to the named upstream.
pub async fn proxy_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if !proxy_svc::is_forwardable(&method) {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let Some((raw_service, tail)) = split_proxy_path(uri.path()) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let service = ServiceName::parse(raw_service).inspect_err(|e| {
        tracing::warn!(service = %e.0, "proxy request for unknown service");
    })?;

    let base_url = state.config.services.base_url(service);
    let request = ProxyRequest::new(method.clone(), tail, uri.query(), &headers, body);

    proxy_svc::forward(&state.http, service, base_url, request, state.config.timeouts.proxy)
        .await
        .inspect(|response| {
            tracing::info!(%service, %method, status = response.status().as_u16(), "proxied");
        })
        .inspect_err(|e| {
            tracing::error!(%service, %method, error = %e, "proxy request failed");
        })
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
