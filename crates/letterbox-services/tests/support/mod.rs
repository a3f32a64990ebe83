//! Recording fakes for every capability the upload pipeline consumes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use letterbox_core::{
    AppError, Capability, NotificationId, PostageOption, PrecompiledTemplate, RejectionReason,
    SendPermit, SendRequest, ServiceContext, UploadedFile,
};
use letterbox_services::{
    AntivirusGateway, ContentRejection, LetterUploadService, LetterValidator,
    NotificationDispatcher, PreviewImage, PreviewRenderer, SanitizationGateway, SanitizeOutcome,
    SanitizedLetter, ServiceDirectory, Storage, StorageError, StorageResult, UploadGateways,
};
use letterbox_storage::{StorageBackend, StoredObject, Tags};
use uuid::Uuid;

pub const MAX_SIZE: usize = 2 * 1024 * 1024;

/// A minimal file that passes the structural checks and declares `pages`
/// pages in its page tree.
pub fn pdf_bytes(pages: u32) -> Bytes {
    Bytes::from(format!(
        "%PDF-1.4\n1 0 obj\n<< /Type /Pages /Count {} >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n",
        pages
    ))
}

pub fn sanitised_bytes() -> Bytes {
    Bytes::from_static(b"%PDF-1.4\nThe sanitised content\n%%EOF\n")
}

pub fn upload(filename: &str, content: Bytes) -> UploadedFile {
    UploadedFile::new(filename, content)
}

pub fn context(restricted: bool, capabilities: &[Capability]) -> ServiceContext {
    ServiceContext {
        service_id: Uuid::parse_str("6ce466d0-fd6a-11e5-82f5-e0accb9d11a6").unwrap(),
        restricted,
        capabilities: capabilities.iter().copied().collect(),
    }
}

pub fn letter_service() -> ServiceContext {
    context(false, &[Capability::Letter, Capability::UploadLetters])
}

#[derive(Default)]
pub struct RecordingStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
}

impl RecordingStorage {
    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn only_object(&self) -> (String, StoredObject) {
        let objects = self.objects.lock().unwrap();
        assert_eq!(objects.len(), 1, "expected exactly one stored object");
        let (key, object) = objects.iter().next().unwrap();
        (key.clone(), object.clone())
    }

    pub fn insert(&self, key: &str, data: Bytes, tags: Tags) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), StoredObject { data, tags });
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn put(&self, key: &str, data: Bytes, tags: &Tags) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                tags: tags.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.object(key).is_some())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

pub struct FakeAntivirus {
    pub clean: bool,
    /// Every scan fails as if the scanner were unreachable.
    pub broken: bool,
    pub scans: AtomicUsize,
}

impl FakeAntivirus {
    pub fn new(clean: bool, broken: bool) -> Self {
        Self {
            clean,
            broken,
            scans: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AntivirusGateway for FakeAntivirus {
    async fn scan(&self, _data: &Bytes) -> Result<bool, AppError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(AppError::gateway("antivirus", "connection refused"));
        }
        Ok(self.clean)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// What the fake sanitiser answers with.
#[derive(Clone)]
pub enum SanitiseReply {
    Sanitized {
        recipient: String,
        page_count: Option<u32>,
    },
    Rejected {
        message: RejectionReason,
        invalid_pages: Vec<u32>,
        page_count: Option<u32>,
    },
    Broken,
}

pub struct FakeSanitizer {
    reply: SanitiseReply,
    pub calls: AtomicUsize,
}

impl FakeSanitizer {
    pub fn new(reply: SanitiseReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SanitizationGateway for FakeSanitizer {
    async fn sanitise(&self, _data: &Bytes) -> Result<SanitizeOutcome, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply.clone() {
            SanitiseReply::Sanitized {
                recipient,
                page_count,
            } => Ok(SanitizeOutcome::Sanitized(SanitizedLetter {
                content: sanitised_bytes(),
                recipient_address: recipient,
                page_count,
            })),
            SanitiseReply::Rejected {
                message,
                invalid_pages,
                page_count,
            } => Ok(SanitizeOutcome::Rejected(ContentRejection {
                message,
                invalid_pages,
                page_count,
            })),
            SanitiseReply::Broken => Err(AppError::gateway("sanitise", "500 Internal Server Error")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    Plain(u32),
    Overlay(u32),
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: Mutex<Vec<Render>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<Render> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PreviewRenderer for RecordingRenderer {
    async fn render_plain(&self, _data: &Bytes, page: u32) -> Result<PreviewImage, AppError> {
        self.calls.lock().unwrap().push(Render::Plain(page));
        Ok(PreviewImage::png(Bytes::from_static(b"plain-png")))
    }

    async fn render_with_overlay(
        &self,
        _data: &Bytes,
        page: u32,
    ) -> Result<PreviewImage, AppError> {
        self.calls.lock().unwrap().push(Render::Overlay(page));
        Ok(PreviewImage::png(Bytes::from_static(b"overlay-png")))
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<SendRequest>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().unwrap().clone()
    }
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

#[derive(Default)]
pub struct FakeDirectory {
    pub template_postage: Option<PostageOption>,
}

#[async_trait]
impl ServiceDirectory for FakeDirectory {
    async fn get_service(&self, service_id: Uuid) -> Result<ServiceContext, AppError> {
        let mut ctx = letter_service();
        ctx.service_id = service_id;
        Ok(ctx)
    }

    async fn get_precompiled_template(
        &self,
        _service_id: Uuid,
    ) -> Result<Option<PrecompiledTemplate>, AppError> {
        Ok(Some(PrecompiledTemplate {
            id: Uuid::new_v4(),
            postage: self.template_postage,
        }))
    }

    async fn api_status(&self) -> Result<String, AppError> {
        Ok("ok".to_string())
    }
}

/// A service wired to fakes, with handles on each fake for assertions.
pub struct Harness {
    pub storage: Arc<RecordingStorage>,
    pub antivirus: Arc<FakeAntivirus>,
    pub sanitizer: Arc<FakeSanitizer>,
    pub renderer: Arc<RecordingRenderer>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub directory: Arc<FakeDirectory>,
    pub service: LetterUploadService,
}

pub struct HarnessBuilder {
    clean: bool,
    scanner_down: bool,
    reply: SanitiseReply,
    template_postage: Option<PostageOption>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            clean: true,
            scanner_down: false,
            reply: SanitiseReply::Sanitized {
                recipient: "The Queen\nBuckingham Palace\r\nSW1 1AA".to_string(),
                page_count: Some(1),
            },
            template_postage: None,
        }
    }
}

impl HarnessBuilder {
    pub fn infected(mut self) -> Self {
        self.clean = false;
        self
    }

    pub fn scanner_down(mut self) -> Self {
        self.scanner_down = true;
        self
    }

    pub fn sanitise_reply(mut self, reply: SanitiseReply) -> Self {
        self.reply = reply;
        self
    }

    pub fn template_postage(mut self, postage: PostageOption) -> Self {
        self.template_postage = Some(postage);
        self
    }

    pub fn build(self) -> Harness {
        let storage = Arc::new(RecordingStorage::default());
        let antivirus = Arc::new(FakeAntivirus::new(self.clean, self.scanner_down));
        let sanitizer = Arc::new(FakeSanitizer::new(self.reply));
        let renderer = Arc::new(RecordingRenderer::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let directory = Arc::new(FakeDirectory {
            template_postage: self.template_postage,
        });

        let service = LetterUploadService::new(
            UploadGateways {
                storage: storage.clone(),
                antivirus: antivirus.clone(),
                sanitizer: sanitizer.clone(),
                renderer: renderer.clone(),
                dispatcher: dispatcher.clone(),
                directory: directory.clone(),
            },
            LetterValidator::new(MAX_SIZE),
        );

        Harness {
            storage,
            antivirus,
            sanitizer,
            renderer,
            dispatcher,
            directory,
            service,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder::default()
}
