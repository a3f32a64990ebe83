//! Client for the template preview service.
//!
//! The service sanitises precompiled letters and renders their pages to PNG.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use letterbox_core::{AppError, RejectionReason};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::traits::{
    ContentRejection, PreviewImage, PreviewRenderer, SanitizationGateway, SanitizeOutcome,
    SanitizedLetter,
};

const SANITISE: &str = "sanitise";
const PREVIEW: &str = "template-preview";

#[derive(Debug, Deserialize)]
struct SanitiseSuccess {
    file: String,
    #[serde(default)]
    recipient_address: String,
    #[serde(default)]
    page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SanitiseRejection {
    message: String,
    #[serde(default)]
    invalid_pages: Vec<u32>,
    #[serde(default)]
    page_count: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TemplatePreviewClient {
    http_client: reqwest::Client,
    api_host: String,
    api_key: String,
}

impl TemplatePreviewClient {
    pub fn new(api_host: String, api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client for template preview")?;

        Ok(Self {
            http_client,
            api_host: api_host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }

    async fn render(&self, url: String, body: Vec<u8>, page: u32) -> Result<PreviewImage, AppError> {
        let start = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::gateway(PREVIEW, format!("Render request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::gateway(
                PREVIEW,
                format!("Render of page {} failed with {}", page, status),
            ));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| AppError::gateway(PREVIEW, e.to_string()))?;
        tracing::debug!(
            page,
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_millis(),
            "Rendered letter page"
        );
        Ok(PreviewImage::png(content))
    }
}

#[async_trait]
impl SanitizationGateway for TemplatePreviewClient {
    async fn sanitise(&self, data: &Bytes) -> Result<SanitizeOutcome, AppError> {
        let start = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/precompiled/sanitise", self.api_host))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .body(data.clone())
            .send()
            .await
            .map_err(|e| AppError::gateway(SANITISE, format!("Sanitise request failed: {}", e)))?;

        let status = response.status();
        let outcome = match status {
            StatusCode::OK => {
                let body: SanitiseSuccess = response.json().await.map_err(|e| {
                    AppError::gateway(SANITISE, format!("Invalid sanitise response: {}", e))
                })?;
                let content = base64::engine::general_purpose::STANDARD
                    .decode(body.file.as_bytes())
                    .map_err(|e| {
                        AppError::gateway(SANITISE, format!("Sanitised file is not base64: {}", e))
                    })?;
                SanitizeOutcome::Sanitized(SanitizedLetter {
                    content: Bytes::from(content),
                    recipient_address: body.recipient_address,
                    page_count: body.page_count,
                })
            }
            StatusCode::BAD_REQUEST => {
                let body: SanitiseRejection = response.json().await.map_err(|e| {
                    AppError::gateway(SANITISE, format!("Invalid sanitise rejection: {}", e))
                })?;
                SanitizeOutcome::Rejected(ContentRejection {
                    message: RejectionReason::from(body.message),
                    invalid_pages: body.invalid_pages,
                    page_count: body.page_count,
                })
            }
            other => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::gateway(
                    SANITISE,
                    format!("Sanitise request failed: {} - {}", other, error_text),
                ));
            }
        };

        tracing::debug!(
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "Sanitise completed"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl PreviewRenderer for TemplatePreviewClient {
    async fn render_plain(&self, data: &Bytes, page: u32) -> Result<PreviewImage, AppError> {
        let url = format!(
            "{}/precompiled-preview.png?hide_notify=true&page={}",
            self.api_host, page
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        self.render(url, encoded.into_bytes(), page).await
    }

    async fn render_with_overlay(
        &self,
        data: &Bytes,
        page: u32,
    ) -> Result<PreviewImage, AppError> {
        let url = format!("{}/precompiled/overlay.png?page={}", self.api_host, page);
        self.render(url, data.to_vec(), page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitise_success_body() {
        let body: SanitiseSuccess = serde_json::from_str(
            r#"{"file": "VGhlIHNhbml0aXNlZCBjb250ZW50", "recipient_address": "The Queen"}"#,
        )
        .unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(body.file.as_bytes())
            .unwrap();
        assert_eq!(decoded, b"The sanitised content");
        assert_eq!(body.recipient_address, "The Queen");
        assert_eq!(body.page_count, None);
    }

    #[test]
    fn test_sanitise_rejection_body_without_pages() {
        let body: SanitiseRejection =
            serde_json::from_str(r#"{"message": "template preview error", "recipient_address": "The Queen"}"#)
                .unwrap();
        assert_eq!(
            RejectionReason::from(body.message),
            RejectionReason::Other("template preview error".to_string())
        );
        assert!(body.invalid_pages.is_empty());
    }

    #[tokio::test]
    async fn test_sanitise_connect_error_propagates() {
        let client =
            TemplatePreviewClient::new("http://127.0.0.1:1".to_string(), "key".to_string(), 5)
                .unwrap();
        let result = client.sanitise(&Bytes::from_static(b"%PDF-1.4")).await;
        assert!(matches!(
            result,
            Err(AppError::Gateway {
                gateway: "sanitise",
                ..
            })
        ));
    }
}
