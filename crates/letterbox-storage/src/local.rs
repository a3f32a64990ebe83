use crate::traits::{Storage, StorageError, StorageResult, StoredObject, Tags};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const TAGS_SUFFIX: &str = ".tags.json";

/// Local filesystem storage implementation
///
/// Tags are kept in a JSON sidecar next to each object: `{key}.tags.json`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`, creating the
    /// directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with path traversal sequences that could escape the base
    /// storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                storage_key
            )));
        }

        let path = self.base_path.join(storage_key);

        if let (Ok(base), Ok(canonical)) = (self.base_path.canonicalize(), path.canonicalize()) {
            if canonical.strip_prefix(&base).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn tags_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(TAGS_SUFFIX);
        PathBuf::from(name)
    }

    async fn write_contents(
        file: &mut fs::File,
        path: &Path,
        data: &[u8],
        tags: &Tags,
    ) -> StorageResult<()> {
        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let tags_json = serde_json::to_vec(tags)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode tags: {}", e)))?;
        fs::write(Self::tags_path(path), tags_json)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write tags for {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    /// Best-effort removal of a partially written object and its sidecar.
    async fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial object");
        }
        let tags_path = Self::tags_path(path);
        if let Err(e) = fs::remove_file(&tags_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %tags_path.display(), error = %e, "Failed to remove partial tags");
            }
        }
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Bytes, tags: &Tags) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
                _ => StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                )),
            })?;

        if let Err(e) = Self::write_contents(&mut file, &path, &data, tags).await {
            drop(file);
            self.discard(&path).await;
            return Err(e);
        }

        tracing::info!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })?;

        let tags = match fs::read(Self::tags_path(&path)).await {
            Ok(raw) => serde_json::from_slice::<Tags>(&raw).map_err(|e| {
                StorageError::DownloadFailed(format!("Corrupt tags for {}: {}", key, e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(key = %key, "Object has no tags sidecar");
                Tags::new()
            }
            Err(e) => return Err(StorageError::IoError(e)),
        };

        tracing::debug!(
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local download successful"
        );

        Ok(StoredObject {
            data: Bytes::from(data),
            tags,
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tags() -> Tags {
        Tags::from([
            ("status".to_string(), "valid".to_string()),
            ("page_count".to_string(), "1".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_local_storage_put_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let key = "service-1/letter.pdf";
        storage
            .put(key, Bytes::from_static(b"%PDF-1.7"), &tags())
            .await
            .unwrap();

        let object = storage.get(key).await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"%PDF-1.7"));
        assert_eq!(object.tags, tags());
        assert!(dir.path().join("service-1/letter.pdf.tags.json").exists());
    }

    #[tokio::test]
    async fn test_local_storage_is_write_once() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage
            .put("a/b.pdf", Bytes::from_static(b"one"), &tags())
            .await
            .unwrap();
        let result = storage
            .put("a/b.pdf", Bytes::from_static(b"two"), &Tags::new())
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));

        let object = storage.get("a/b.pdf").await.unwrap();
        assert_eq!(object.data, Bytes::from_static(b"one"));
    }

    #[tokio::test]
    async fn test_failed_tags_write_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        // A directory where the sidecar should go makes the tags write fail.
        std::fs::create_dir_all(dir.path().join("service-1/letter.pdf.tags.json")).unwrap();

        let result = storage
            .put("service-1/letter.pdf", Bytes::from_static(b"%PDF-1.7"), &tags())
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert!(!storage.exists("service-1/letter.pdf").await.unwrap());
        assert!(dir.path().join("service-1/letter.pdf.tags.json").is_dir());
    }

    #[tokio::test]
    async fn test_local_storage_get_missing() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("service-1/missing.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(!storage.exists("service-1/missing.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .put("../escape.pdf", Bytes::new(), &Tags::new())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
