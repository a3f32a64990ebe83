#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use letterbox_api::setup::routes::setup_routes;
use letterbox_api::AppState;
use letterbox_core::{
    AppError, Capability, Config, NotificationId, PostageOption, PrecompiledTemplate,
    RejectionReason, SendPermit, SendRequest, ServiceContext,
};
use letterbox_services::{
    AntivirusGateway, ContentRejection, LetterUploadService, LetterValidator,
    NotificationDispatcher, PreviewImage, PreviewRenderer, SanitizationGateway, SanitizeOutcome,
    SanitizedLetter, ServiceDirectory, UploadGateways,
};
use letterbox_storage::LocalStorage;
use tempfile::TempDir;
use uuid::Uuid;

pub const SERVICE_ID: &str = "6ce466d0-fd6a-11e5-82f5-e0accb9d11a6";

pub fn service_id() -> Uuid {
    Uuid::parse_str(SERVICE_ID).unwrap()
}

pub fn pdf_bytes(pages: u32) -> Vec<u8> {
    format!(
        "%PDF-1.4\n1 0 obj\n<< /Type /Pages /Count {} >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n",
        pages
    )
    .into_bytes()
}

pub struct FakeAntivirus {
    clean: bool,
}

#[async_trait]
impl AntivirusGateway for FakeAntivirus {
    async fn scan(&self, _data: &Bytes) -> Result<bool, AppError> {
        Ok(self.clean)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct FakeSanitizer {
    rejection: Option<(RejectionReason, Vec<u32>)>,
}

#[async_trait]
impl SanitizationGateway for FakeSanitizer {
    async fn sanitise(&self, data: &Bytes) -> Result<SanitizeOutcome, AppError> {
        Ok(match &self.rejection {
            None => SanitizeOutcome::Sanitized(SanitizedLetter {
                content: data.clone(),
                recipient_address: "The Queen\nBuckingham Palace\nSW1 1AA".to_string(),
                page_count: Some(1),
            }),
            Some((message, pages)) => SanitizeOutcome::Rejected(ContentRejection {
                message: message.clone(),
                invalid_pages: pages.clone(),
                page_count: Some(2),
            }),
        })
    }
}

pub struct FakeRenderer;

#[async_trait]
impl PreviewRenderer for FakeRenderer {
    async fn render_plain(&self, _data: &Bytes, _page: u32) -> Result<PreviewImage, AppError> {
        Ok(PreviewImage::png(Bytes::from_static(b"plain")))
    }

    async fn render_with_overlay(
        &self,
        _data: &Bytes,
        _page: u32,
    ) -> Result<PreviewImage, AppError> {
        Ok(PreviewImage::png(Bytes::from_static(b"overlay")))
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<SendRequest>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send_precompiled_letter(
        &self,
        _permit: &SendPermit,
        request: &SendRequest,
    ) -> Result<NotificationId, AppError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(request.file_id.notification_id())
    }
}

pub struct FakeDirectory {
    restricted: bool,
    capabilities: Vec<Capability>,
    api_up: bool,
}

#[async_trait]
impl ServiceDirectory for FakeDirectory {
    async fn get_service(&self, service_id: Uuid) -> Result<ServiceContext, AppError> {
        Ok(ServiceContext {
            service_id,
            restricted: self.restricted,
            capabilities: self.capabilities.iter().copied().collect(),
        })
    }

    async fn get_precompiled_template(
        &self,
        _service_id: Uuid,
    ) -> Result<Option<PrecompiledTemplate>, AppError> {
        Ok(Some(PrecompiledTemplate {
            id: Uuid::new_v4(),
            postage: Some(PostageOption::Second),
        }))
    }

    async fn api_status(&self) -> Result<String, AppError> {
        if self.api_up {
            Ok("ok".to_string())
        } else {
            Err(AppError::gateway("notify-api", "connection refused"))
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.dispatcher.sent.lock().unwrap().clone()
    }
}

pub struct TestAppBuilder {
    clean: bool,
    rejection: Option<(RejectionReason, Vec<u32>)>,
    restricted: bool,
    capabilities: Vec<Capability>,
    api_up: bool,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            clean: true,
            rejection: None,
            restricted: false,
            capabilities: vec![Capability::Letter, Capability::UploadLetters],
            api_up: true,
        }
    }
}

impl TestAppBuilder {
    pub fn infected(mut self) -> Self {
        self.clean = false;
        self
    }

    pub fn content_rejected(mut self, message: RejectionReason, pages: Vec<u32>) -> Self {
        self.rejection = Some((message, pages));
        self
    }

    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn api_down(mut self) -> Self {
        self.api_up = false;
        self
    }

    pub async fn build(self) -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).await.unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::default());

        let config = Config {
            local_storage_path: Some(temp_dir.path().display().to_string()),
            app_build: Some("1234".to_string()),
            app_built_at: Some("2026-10-01T09:00:00Z".to_string()),
            ..Config::default()
        };

        let uploads = LetterUploadService::new(
            UploadGateways {
                storage: Arc::new(storage),
                antivirus: Arc::new(FakeAntivirus { clean: self.clean }),
                sanitizer: Arc::new(FakeSanitizer {
                    rejection: self.rejection,
                }),
                renderer: Arc::new(FakeRenderer),
                dispatcher: dispatcher.clone(),
                directory: Arc::new(FakeDirectory {
                    restricted: self.restricted,
                    capabilities: self.capabilities,
                    api_up: self.api_up,
                }),
            },
            LetterValidator::new(config.max_letter_size_bytes),
        );

        let state = Arc::new(AppState::new(config, uploads));
        let server = TestServer::new(setup_routes(state).into_make_service())
            .expect("Failed to create test server");

        TestApp {
            server,
            dispatcher,
            _temp_dir: temp_dir,
        }
    }
}

pub fn test_app() -> TestAppBuilder {
    TestAppBuilder::default()
}
