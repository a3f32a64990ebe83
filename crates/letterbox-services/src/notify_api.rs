//! Client for the notification API: service records, precompiled templates
//! and letter dispatch.

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use letterbox_core::{
    AppError, Capability, NotificationId, PostageOption, PrecompiledTemplate, SendPermit,
    SendRequest, ServiceContext,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traits::{NotificationDispatcher, ServiceDirectory};

const GATEWAY: &str = "notify-api";

#[derive(Debug, Deserialize)]
struct ServiceEnvelope {
    data: ServiceRecord,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    id: Uuid,
    #[serde(default)]
    restricted: bool,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TemplateRecord {
    id: Uuid,
    #[serde(default)]
    postage: Option<PostageOption>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct SendPdfLetterBody<'a> {
    filename: &'a str,
    file_id: Uuid,
    postage: PostageOption,
    recipient_address: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendPdfLetterResponse {
    id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NotifyApiClient {
    http_client: reqwest::Client,
    api_host: String,
    api_key: String,
}

impl NotifyApiClient {
    pub fn new(api_host: String, api_key: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client for notification API")?;

        Ok(Self {
            http_client,
            api_host: api_host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// GET a JSON resource. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.api_host, path))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, format!("GET {} failed: {}", path, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response.json().await.map(Some).map_err(|e| {
                AppError::gateway(GATEWAY, format!("Invalid response from {}: {}", path, e))
            }),
            status => Err(AppError::gateway(
                GATEWAY,
                format!("GET {} returned {}", path, status),
            )),
        }
    }
}

#[async_trait]
impl ServiceDirectory for NotifyApiClient {
    async fn get_service(&self, service_id: Uuid) -> Result<ServiceContext, AppError> {
        let envelope: ServiceEnvelope = self
            .get_json(&format!("/service/{}", service_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service not found: {}", service_id)))?;

        let record = envelope.data;
        Ok(ServiceContext {
            service_id: record.id,
            restricted: record.restricted,
            capabilities: record
                .permissions
                .iter()
                .filter_map(|p| Capability::from_name(p))
                .collect(),
        })
    }

    async fn get_precompiled_template(
        &self,
        service_id: Uuid,
    ) -> Result<Option<PrecompiledTemplate>, AppError> {
        let template: Option<TemplateRecord> = self
            .get_json(&format!("/service/{}/template/precompiled", service_id))
            .await?;
        Ok(template.map(|t| PrecompiledTemplate {
            id: t.id,
            postage: t.postage,
        }))
    }

    async fn api_status(&self) -> Result<String, AppError> {
        let status: StatusResponse = self
            .get_json("/_status")
            .await?
            .ok_or_else(|| AppError::gateway(GATEWAY, "status endpoint missing"))?;
        Ok(status.status)
    }
}

#[async_trait]
impl NotificationDispatcher for NotifyApiClient {
    async fn send_precompiled_letter(
        &self,
        permit: &SendPermit,
        request: &SendRequest,
    ) -> Result<NotificationId, AppError> {
        let start = Instant::now();
        let body = SendPdfLetterBody {
            filename: &request.filename,
            file_id: request.file_id.as_uuid(),
            postage: request.postage,
            recipient_address: &request.recipient,
        };

        let response = self
            .http_client
            .post(format!(
                "{}/service/{}/send-pdf-letter",
                self.api_host,
                permit.service_id()
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, format!("Send request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::gateway(
                GATEWAY,
                format!("Send request failed: {} - {}", status, error_text),
            ));
        }

        let sent: SendPdfLetterResponse = response
            .json()
            .await
            .map_err(|e| AppError::gateway(GATEWAY, format!("Invalid send response: {}", e)))?;

        tracing::info!(
            service_id = %permit.service_id(),
            file_id = %request.file_id,
            duration_ms = start.elapsed().as_millis(),
            "Precompiled letter dispatched"
        );
        Ok(NotificationId::from_uuid(sent.id))
    }
}
