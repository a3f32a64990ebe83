//! Status and health endpoints.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_PROBE_KEY: &str = "health-check/probe.pdf";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub api_status: String,
    pub api_build: Option<String>,
    pub api_built_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub storage: String,
    pub antivirus: String,
}

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

/// Always answers ok. The upstream API's own status is reported alongside,
/// or `n/a` when it cannot be reached.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let api_status = match state.uploads.gateways().directory.api_status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Upstream status check failed");
            "n/a".to_string()
        }
    };

    Json(StatusResponse {
        status: "ok",
        api_status,
        api_build: state.config.app_build.clone(),
        api_built_time: state.config.app_built_at.clone(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let gateways = state.uploads.gateways();
    let storage = run_check(
        async { gateways.storage.exists(HEALTH_PROBE_KEY).await.map(|_| ()) },
        "unhealthy",
    )
    .await;
    let antivirus = run_check(gateways.antivirus.health_check(), "unhealthy").await;

    let healthy = storage == "healthy" && antivirus == "healthy";
    let (code, status) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            storage,
            antivirus,
        }),
    )
}
