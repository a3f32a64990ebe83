//! Interfaces to the external capabilities the upload pipeline consumes.
//!
//! Each call is one round trip. Any `Err` is a transport failure and is never
//! recovered by the pipeline; expected outcomes (malware found, content
//! rejected) are `Ok` values.

use async_trait::async_trait;
use bytes::Bytes;
use letterbox_core::{
    AppError, NotificationId, PrecompiledTemplate, RejectionReason, SendPermit, SendRequest,
    ServiceContext,
};
use uuid::Uuid;

#[async_trait]
pub trait AntivirusGateway: Send + Sync {
    /// `Ok(true)` when the data is clean, `Ok(false)` when malware was found.
    async fn scan(&self, data: &Bytes) -> Result<bool, AppError>;

    /// Check that the scanner is reachable.
    async fn health_check(&self) -> Result<(), AppError>;
}

/// A letter the template preview service accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedLetter {
    pub content: Bytes,
    /// As extracted from the address block. May be empty.
    pub recipient_address: String,
    pub page_count: Option<u32>,
}

/// The template preview service's verdict that the file itself is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRejection {
    pub message: RejectionReason,
    pub invalid_pages: Vec<u32>,
    pub page_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    Sanitized(SanitizedLetter),
    Rejected(ContentRejection),
}

#[async_trait]
pub trait SanitizationGateway: Send + Sync {
    async fn sanitise(&self, data: &Bytes) -> Result<SanitizeOutcome, AppError>;
}

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub content: Bytes,
    pub content_type: String,
}

impl PreviewImage {
    pub fn png(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            content_type: "image/png".to_string(),
        }
    }
}

#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    /// Render a 1-based page as it will be printed.
    async fn render_plain(&self, data: &Bytes, page: u32) -> Result<PreviewImage, AppError>;

    /// Render a 1-based page with the printable-area boundary highlighted.
    async fn render_with_overlay(&self, data: &Bytes, page: u32)
        -> Result<PreviewImage, AppError>;
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hand a stored letter over for printing and posting.
    async fn send_precompiled_letter(
        &self,
        permit: &SendPermit,
        request: &SendRequest,
    ) -> Result<NotificationId, AppError>;
}

#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn get_service(&self, service_id: Uuid) -> Result<ServiceContext, AppError>;

    async fn get_precompiled_template(
        &self,
        service_id: Uuid,
    ) -> Result<Option<PrecompiledTemplate>, AppError>;

    /// Status string reported by the upstream API.
    async fn api_status(&self) -> Result<String, AppError>;
}
