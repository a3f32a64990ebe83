//! Client for an HTTP antivirus API.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use letterbox_core::AppError;
use serde::Deserialize;

use crate::traits::AntivirusGateway;

const GATEWAY: &str = "antivirus";

#[derive(Debug, Deserialize)]
struct ScanResponse {
    ok: bool,
}

/// Antivirus gateway that posts documents to `{host}/scan`.
#[derive(Debug, Clone)]
pub struct AntivirusApiGateway {
    http_client: reqwest::Client,
    api_host: String,
    api_key: String,
}

impl AntivirusApiGateway {
    pub fn new(api_host: String, api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client for antivirus API")?;

        Ok(Self {
            http_client,
            api_host: api_host.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl AntivirusGateway for AntivirusApiGateway {
    async fn scan(&self, data: &Bytes) -> Result<bool, AppError> {
        let start = Instant::now();
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name("letter.pdf")
            .mime_str("application/pdf")
            .map_err(|e| AppError::gateway(GATEWAY, e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("document", part);

        let response = self
            .http_client
            .post(format!("{}/scan", self.api_host))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, format!("Scan request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::gateway(
                GATEWAY,
                format!("Scan request failed: {} - {}", status, error_text),
            ));
        }

        let body: ScanResponse = response
            .json()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, format!("Invalid scan response: {}", e)))?;

        tracing::debug!(
            clean = body.ok,
            duration_ms = start.elapsed().as_millis(),
            "Antivirus API scan completed"
        );
        Ok(body.ok)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let response = self
            .http_client
            .get(format!("{}/_status", self.api_host))
            .send()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::gateway(
                GATEWAY,
                format!("Status check returned {}", response.status()),
            ))
        }
    }
}
