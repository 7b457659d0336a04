//! Health routes: aggregated upstream health and the service listing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;

use crate::services::health::{self as health_svc, HealthStatus};
use crate::state::AppState;

/// `GET /api/health`: probe every upstream; 200 when all are healthy, 503 otherwise.
pub async fn aggregate_health(State(state): State<AppState>) -> impl IntoResponse {
    let report = health_svc::check_all(&state.http, &state.config.services, state.config.timeouts.health).await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded | HealthStatus::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

#[derive(Serialize)]
pub struct ServiceEntry {
    pub name: &'static str,
    pub base_url: String,
    pub proxy_prefix: String,
}

/// `GET /api/services`: configured upstreams and their proxy prefixes.
pub async fn list_services(State(state): State<AppState>) -> Json<Vec<ServiceEntry>> {
    let entries = state
        .config
        .services
        .iter()
        .map(|(service, base_url)| ServiceEntry {
            name: service.as_str(),
            base_url: base_url.to_string(),
            proxy_prefix: format!("/api/proxy/{service}/"),
        })
        .collect();
    Json(entries)
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
