mod config;
mod error;
mod routes;
mod services;
mod state;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal in deployed environments.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match config::GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid gateway configuration");
            return ExitCode::FAILURE;
        }
    };

    for (service, url) in config.services.iter() {
        tracing::info!(%service, upstream = url, "upstream configured");
    }
    tracing::info!(
        proxy_timeout_secs = config.timeouts.proxy.as_secs(),
        health_timeout_secs = config.timeouts.health.as_secs(),
        "timeouts configured"
    );

    let addr = config.listen_addr();
    let state = match state::AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "upstream HTTP client init failed");
            return ExitCode::FAILURE;
        }
    };

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(%addr, "imss-gateway listening");
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("imss-gateway stopped");
    ExitCode::SUCCESS
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
