//! Health aggregation across upstream services.
//!
//! Every configured service is probed at `{base}/api/health` concurrently,
//! each probe bounded by its own timeout. A probe never fails the report; it
//! only changes that service's status.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::registry::{ServiceName, ServiceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unreachable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub service: &'static str,
    pub url: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    pub version: &'static str,
    pub services: Vec<ServiceHealth>,
}

/// Probe one service's health endpoint.
pub async fn probe(http: &reqwest::Client, service: ServiceName, base_url: &str, timeout: Duration) -> ServiceHealth {
    let url = format!("{base_url}/api/health");
    let started = Instant::now();
    let result = http.get(&url).timeout(timeout).send().await;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (status, http_status, error) = match result {
        Ok(response) if response.status().is_success() => (HealthStatus::Healthy, Some(response.status().as_u16()), None),
        Ok(response) => {
            let code = response.status().as_u16();
            (HealthStatus::Degraded, Some(code), Some(format!("HTTP {code}")))
        }
        Err(e) if e.is_timeout() => {
            (HealthStatus::Unreachable, None, Some(format!("timeout after {}ms", timeout.as_millis())))
        }
        Err(e) => (HealthStatus::Unreachable, None, Some(e.to_string())),
    };

    if status != HealthStatus::Healthy {
        tracing::warn!(%service, upstream = %url, ?status, error = error.as_deref().unwrap_or(""), "health probe failed");
    }

    ServiceHealth { service: service.as_str(), url, status, latency_ms, http_status, error }
}

/// Overall status: healthy only when every service is healthy, unreachable
/// when none answered at all, degraded otherwise.
#[must_use]
pub fn aggregate(services: &[ServiceHealth]) -> HealthStatus {
    if services.iter().all(|s| s.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else if services.iter().all(|s| s.status == HealthStatus::Unreachable) {
        HealthStatus::Unreachable
    } else {
        HealthStatus::Degraded
    }
}

/// Probe all services concurrently and build the aggregate report.
pub async fn check_all(http: &reqwest::Client, registry: &ServiceRegistry, timeout: Duration) -> HealthReport {
    let probes = registry.iter().map(|(service, base_url)| probe(http, service, base_url, timeout));
    let services = join_all(probes).await;
    HealthReport {
        status: aggregate(&services),
        timestamp: now_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        services,
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
