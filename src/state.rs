//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! The gateway is stateless per request: it holds only the parsed config and
//! one pooled upstream HTTP client shared by the proxy and health routes.

use std::sync::Arc;

use crate::config::GatewayConfig;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or cheap clones.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    /// Pooled client for every upstream call. No overall request timeout is
    /// set so streamed bodies are not cut off.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state and the upstream client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .build()?;
        Ok(Self { config: Arc::new(config), http })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayTimeouts;
    use crate::services::registry::{ServiceName, ServiceRegistry};

    #[test]
    fn new_shares_config_across_clones() {
        let config = GatewayConfig {
            bind_addr: [127, 0, 0, 1].into(),
            port: 0,
            services: ServiceRegistry::from_fn(|s| s.default_url().to_string()),
            timeouts: GatewayTimeouts::default(),
            max_body_bytes: 1024,
        };
        let state = AppState::new(config).unwrap();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.config, &cloned.config));
        assert_eq!(cloned.config.services.base_url(ServiceName::Educacion), "http://localhost:8002");
    }
}
