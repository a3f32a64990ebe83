//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use std::collections::BTreeMap;

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use letterbox_core::AppError;
use thiserror::Error;

/// Small string key/value pairs kept alongside an object.
pub type Tags = BTreeMap<String, String>;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    /// Objects are write-once.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Letter not found: {}", key)),
            StorageError::ConfigError(msg) => AppError::Config(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// An object read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub tags: Tags,
}

/// Storage abstraction trait
///
/// Every backend keeps the object content and its tags together: a `get`
/// always returns the tags written by the `put` that created the object.
///
/// **Key format:** `service-{service_id}/{file_id}.pdf`. See [`crate::keys`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` with `tags` under `key`. Fails if the key is taken.
    async fn put(&self, key: &str, data: Bytes, tags: &Tags) -> StorageResult<()>;

    /// Read an object and its tags.
    async fn get(&self, key: &str) -> StorageResult<StoredObject>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err: AppError = StorageError::NotFound("service-1/abc.pdf".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_backend_error_maps_to_storage() {
        let err: AppError = StorageError::BackendError("timeout".to_string()).into();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
