//! Service registry: maps proxy service names to upstream base URLs.

use std::fmt;

// =============================================================================
// SERVICE NAME
// =============================================================================

/// A backend microservice reachable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
    Chatbot,
    Educacion,
    Simulacion,
    Radiografias,
}

/// The `{service}` path segment did not name a known backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service: {0}")]
pub struct UnknownService(pub String);

impl ServiceName {
    pub const ALL: [ServiceName; 4] = [Self::Chatbot, Self::Educacion, Self::Simulacion, Self::Radiografias];

    /// Parse the wire name. Matching is exact and case-sensitive.
    pub fn parse(raw: &str) -> Result<Self, UnknownService> {
        match raw {
            "chatbot" => Ok(Self::Chatbot),
            "educacion" => Ok(Self::Educacion),
            "simulacion" => Ok(Self::Simulacion),
            "radiografias" => Ok(Self::Radiografias),
            other => Err(UnknownService(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chatbot => "chatbot",
            Self::Educacion => "educacion",
            Self::Simulacion => "simulacion",
            Self::Radiografias => "radiografias",
        }
    }

    /// Environment variable holding this service's base URL.
    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Chatbot => "CHATBOT_SERVICE_URL",
            Self::Educacion => "EDUCACION_SERVICE_URL",
            Self::Simulacion => "SIMULACION_SERVICE_URL",
            Self::Radiografias => "RADIOGRAFIAS_SERVICE_URL",
        }
    }

    #[must_use]
    pub fn default_url(self) -> &'static str {
        match self {
            Self::Chatbot => "http://localhost:8001",
            Self::Educacion => "http://localhost:8002",
            Self::Simulacion => "http://localhost:8003",
            Self::Radiografias => "http://localhost:8004",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Chatbot => 0,
            Self::Educacion => 1,
            Self::Simulacion => 2,
            Self::Radiografias => 3,
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Base URL per service, stored without a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistry {
    urls: [String; 4],
}

impl ServiceRegistry {
    /// Build a registry from a lookup function. Every service must resolve.
    pub fn from_fn(mut lookup: impl FnMut(ServiceName) -> String) -> Self {
        let urls = ServiceName::ALL.map(|service| normalize_base_url(&lookup(service)));
        Self { urls }
    }

    #[must_use]
    pub fn base_url(&self, service: ServiceName) -> &str {
        &self.urls[service.index()]
    }

    /// Iterate services in `ServiceName::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (ServiceName, &str)> {
        ServiceName::ALL.into_iter().map(|service| (service, self.base_url(service)))
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
