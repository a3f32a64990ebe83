//! Letterbox Services Layer
//!
//! This crate hosts the upload orchestration and the clients for the external
//! capabilities it consumes (antivirus, template preview, notification API).
//! It re-exports the storage and processing pieces the API crate needs so
//! that handlers depend on a single service facade.

pub mod traits;
pub mod upload;

#[cfg(feature = "http-clients")]
pub mod antivirus_api;
#[cfg(feature = "clamav")]
pub mod clamav;
#[cfg(feature = "http-clients")]
pub mod notify_api;
#[cfg(feature = "http-clients")]
pub mod template_preview;

#[cfg(feature = "http-clients")]
pub use antivirus_api::AntivirusApiGateway;
#[cfg(feature = "clamav")]
pub use clamav::ClamAvGateway;
pub use letterbox_processing::{count_pages, LetterValidator, PdfCheckError};
pub use letterbox_storage::{create_storage, Storage, StorageError, StorageResult};
#[cfg(feature = "http-clients")]
pub use notify_api::NotifyApiClient;
#[cfg(feature = "http-clients")]
pub use template_preview::TemplatePreviewClient;
pub use traits::{
    AntivirusGateway, ContentRejection, NotificationDispatcher, PreviewImage, PreviewRenderer,
    SanitizationGateway, SanitizeOutcome, SanitizedLetter, ServiceDirectory,
};
pub use upload::{
    LetterPreview, LetterUploadService, SendForm, SentLetter, SubmittedSendForm, UploadGateways,
    UploadOutcome, UploadRejection,
};
