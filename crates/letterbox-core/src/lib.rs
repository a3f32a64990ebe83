//! Letterbox Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! address normalization shared by all Letterbox components.

pub mod address;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use address::{format_recipient, normalize_address};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    Capability, FileId, LetterMetadata, NotificationId, PostageOption, PrecompiledTemplate,
    RejectionReason, SendPermit, SendRequest, ServiceContext, UploadedFile, ValidationOutcome,
    ValidationStatus,
};
pub use storage_types::{AntivirusBackend, StorageBackend};
// Note: Storage and StorageError live in letterbox-storage
