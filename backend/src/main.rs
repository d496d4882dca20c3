//! Main entry point for the edugate gateway.
//!
//! This file initializes logging, loads configuration, connects the identity
//! service adapter, starts the status monitor and serves the router.

use std::sync::Arc;

use adapters::{HealthCheck, HttpIdentityAdapter};
use backend::config::Config;
use backend::errors::AppError;
use backend::services::status::StatusMonitor;
use backend::{build_router, AppState};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,edugate=debug,backend=debug"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();

    let config = Config::from_env()?;
    info!(
        identity = %config.identity_url,
        health = %config.health_url,
        "starting edugate"
    );

    let identity = Arc::new(HttpIdentityAdapter::new(
        config.identity_url.clone(),
        config.request_timeout,
    )?);
    let health = Arc::new(HealthCheck::new(
        config.health_url.clone(),
        config.health_timeout,
    )?);
    let monitor = StatusMonitor::spawn(health, config.status_retries);

    let app = build_router(AppState::new(identity, monitor.handle()));

    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|source| AppError::Bind {
            addr: config.bind,
            source,
        })?;
    info!(addr = %config.bind, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
