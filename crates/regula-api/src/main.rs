//! # regula-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`regula_api::config::AppConfig::from_env`].

use regula_api::config::{AppConfig, LogFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let port = config.port;
    let state = regula_api::bootstrap::bootstrap(config).await.map_err(|e| {
        tracing::error!("Bootstrap failed: {e}");
        e
    })?;

    let app = regula_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Regula API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
