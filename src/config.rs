//! Gateway configuration parsed from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::services::registry::{ServiceName, ServiceRegistry};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR: {0}")]
    BindAddr(String),

    #[error("invalid {var}: '{value}' (expected an http:// or https:// URL)")]
    ServiceUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayTimeouts {
    /// Time allowed until upstream response headers arrive.
    pub proxy: Duration,
    /// Per-service bound on `/api/health` probes.
    pub health: Duration,
    pub connect: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            proxy: Duration::from_secs(DEFAULT_PROXY_TIMEOUT_SECS),
            health: Duration::from_secs(DEFAULT_HEALTH_TIMEOUT_SECS),
            connect: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub services: ServiceRegistry,
    pub timeouts: GatewayTimeouts,
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    /// Build typed gateway config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `{CHATBOT,EDUCACION,SIMULACION,RADIOGRAFIAS}_SERVICE_URL`: `http://localhost:800{1..4}`
    /// - `PROXY_TIMEOUT_SECS`: default 30
    /// - `HEALTH_TIMEOUT_SECS`: default 5
    /// - `PROXY_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PROXY_MAX_BODY_BYTES`: default 50 MiB
    ///
    /// # Errors
    ///
    /// Returns an error if `BIND_ADDR` is not an IP address or a service URL
    /// is not an absolute http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = match std::env::var("BIND_ADDR") {
            Ok(raw) => raw.trim().parse::<IpAddr>().map_err(|_| ConfigError::BindAddr(raw))?,
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        for service in ServiceName::ALL {
            if let Ok(value) = std::env::var(service.env_var()) {
                validate_service_url(service, &value)?;
            }
        }
        let services = ServiceRegistry::from_fn(|service| {
            std::env::var(service.env_var()).unwrap_or_else(|_| service.default_url().to_string())
        });

        let timeouts = GatewayTimeouts {
            proxy: env_parse_secs("PROXY_TIMEOUT_SECS", DEFAULT_PROXY_TIMEOUT_SECS),
            health: env_parse_secs("HEALTH_TIMEOUT_SECS", DEFAULT_HEALTH_TIMEOUT_SECS),
            connect: env_parse_secs("PROXY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            bind_addr,
            port: env_parse("PORT", DEFAULT_PORT),
            services,
            timeouts,
            max_body_bytes: env_parse("PROXY_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        })
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Timeouts of zero would fail every call, so they fall back like unparsable values.
fn env_parse_secs(key: &str, default: u64) -> Duration {
    match env_parse(key, default) {
        0 => Duration::from_secs(default),
        secs => Duration::from_secs(secs),
    }
}

fn validate_service_url(service: ServiceName, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => Ok(()),
        _ => Err(ConfigError::ServiceUrl { var: service.env_var(), value: value.to_string() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
