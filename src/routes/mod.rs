//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway exposes one catch-all proxy route per upstream service plus
//! health endpoints. Every proxy response, errors included, carries the
//! permissive CORS headers browsers need to call the gateway cross-origin.

pub mod health;
pub mod proxy;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION,
    CONTENT_TYPE,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{any, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Proxy routes with CORS headers forced onto every response.
fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/api/proxy/{service}/{*path}", any(proxy::proxy_request))
        .layer(SetResponseHeaderLayer::overriding(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
}

/// Full gateway router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request| {
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!("http", method = %req.method(), uri = %req.uri(), request_id)
    });

    let max_body_bytes = state.config.max_body_bytes;

    // Proxy routes answer their own preflights; CorsLayer covers the rest.
    let api = Router::new()
        .route("/api/health", get(health::aggregate_health))
        .route("/api/services", get(health::list_services))
        .route("/healthz", get(healthz))
        .layer(cors);

    Router::new()
        .merge(proxy_routes())
        .merge(api)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(trace)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::Router;
    use tokio::net::TcpListener;

    use crate::config::{GatewayConfig, GatewayTimeouts};
    use crate::services::registry::{ServiceName, ServiceRegistry};
    use crate::state::AppState;

    /// Serve `router` on an ephemeral loopback port and return its base URL.
    pub async fn spawn_server(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr: SocketAddr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server failed");
        });
        format!("http://{addr}")
    }

    /// A loopback URL with nothing listening on it.
    pub async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{addr}")
    }

    #[must_use]
    pub fn test_config(urls: impl FnMut(ServiceName) -> String, proxy_timeout: Duration) -> GatewayConfig {
        GatewayConfig {
            bind_addr: [127, 0, 0, 1].into(),
            port: 0,
            services: ServiceRegistry::from_fn(urls),
            timeouts: GatewayTimeouts {
                proxy: proxy_timeout,
                health: Duration::from_millis(500),
                connect: Duration::from_secs(1),
            },
            max_body_bytes: 1024 * 1024,
        }
    }

    /// Boot the full gateway for `config` and return its base URL.
    pub async fn spawn_gateway(config: GatewayConfig) -> String {
        let state = AppState::new(config).expect("build app state");
        spawn_server(super::app(state)).await
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use crate::services::registry::ServiceName;
    use std::time::Duration;

    #[tokio::test]
    async fn healthz_is_ok_without_upstreams() {
        let dead = dead_url().await;
        let gateway = spawn_gateway(test_config(|_| dead.clone(), Duration::from_secs(1))).await;
        let res = reqwest::get(format!("{gateway}/healthz")).await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn list_services_reports_prefixes() {
        let gateway =
            spawn_gateway(test_config(|s| format!("http://{s}.internal/"), Duration::from_secs(1))).await;
        let body: serde_json::Value =
            reqwest::get(format!("{gateway}/api/services")).await.unwrap().json().await.unwrap();
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), ServiceName::ALL.len());
        assert_eq!(entries[0]["name"], "chatbot");
        assert_eq!(entries[0]["base_url"], "http://chatbot.internal");
        assert_eq!(entries[3]["proxy_prefix"], "/api/proxy/radiografias/");
    }
}
