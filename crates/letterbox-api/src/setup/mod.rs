//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::{Context, Result};
use letterbox_core::Config;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.json_logs())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        antivirus_backend = %config.antivirus_backend,
        "Configuration loaded and validated successfully"
    );

    let uploads = services::initialize_services(&config).await?;
    let state = Arc::new(AppState::new(config, uploads));
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
