//! Storage abstraction for uploaded post images.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::config::SiteConfig;
use crate::{AppError, AppResult};

/// Directory (key prefix) post images are stored under.
pub const POST_IMAGE_DIR: &str = "posts";

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base path for stored files.
    pub base_path: PathBuf,
    /// Base URL for serving files.
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::from(&SiteConfig::default())
    }
}

impl From<&SiteConfig> for StorageConfig {
    fn from(site: &SiteConfig) -> Self {
        Self {
            base_path: site.media_root.clone(),
            base_url: site.media_url.clone(),
        }
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the media root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file. A key that is already taken yields
    /// [`AppError::Conflict`]; existing files are never overwritten.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Create a local storage backend from its configuration.
    #[must_use]
    pub fn from_config(config: StorageConfig) -> Self {
        Self::new(config.base_path, config.base_url)
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AppError::Conflict(format!("File already exists: {key}")),
                _ => AppError::Storage(format!("Failed to create file: {e}")),
            })?;
        file.write_all(data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));

        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

/// Build the storage key for an uploaded post image.
///
/// Only the final path component of the client-supplied name is kept and
/// characters outside `[A-Za-z0-9._-]` become `_`, so `../../x y.gif`
/// is stored as `posts/x_y.gif`.
#[must_use]
pub fn image_storage_key(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    let mut name: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.trim_matches('.').is_empty() {
        name = "image".to_string();
    }

    format!("{POST_IMAGE_DIR}/{name}")
}

/// Insert a suffix before the extension of a storage key:
/// `posts/small.gif` + `abc1234` → `posts/small_abc1234.gif`.
#[must_use]
pub fn suffixed_key(key: &str, suffix: &str) -> String {
    let (dir, file) = match key.rfind('/') {
        Some(pos) => (&key[..=pos], &key[pos + 1..]),
        None => ("", key),
    };

    match file.rfind('.').filter(|&pos| pos > 0) {
        Some(pos) => format!("{dir}{}_{suffix}{}", &file[..pos], &file[pos..]),
        None => format!("{dir}{file}_{suffix}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_storage_key_keeps_file_name() {
        assert_eq!(image_storage_key("small.gif"), "posts/small.gif");
    }

    #[test]
    fn test_image_storage_key_strips_directories() {
        assert_eq!(image_storage_key("../../etc/passwd"), "posts/passwd");
        assert_eq!(image_storage_key("C:\\photos\\cat.png"), "posts/cat.png");
    }

    #[test]
    fn test_image_storage_key_replaces_unsafe_chars() {
        assert_eq!(image_storage_key("my cat?.jpg"), "posts/my_cat_.jpg");
        assert_eq!(image_storage_key(".."), "posts/image");
        assert_eq!(image_storage_key(""), "posts/image");
    }

    #[test]
    fn test_suffixed_key() {
        assert_eq!(
            suffixed_key("posts/small.gif", "abc1234"),
            "posts/small_abc1234.gif"
        );
        assert_eq!(suffixed_key("posts/noext", "x"), "posts/noext_x");
        assert_eq!(suffixed_key("posts/.hidden", "x"), "posts/.hidden_x");
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("yatube-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/media/".to_string());

        let uploaded = storage
            .upload("posts/small.gif", b"GIF89a", "image/gif")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "/media/posts/small.gif");
        assert_eq!(uploaded.size, 6);
        assert!(storage.exists("posts/small.gif").await.unwrap());

        storage.delete("posts/small.gif").await.unwrap();
        assert!(!storage.exists("posts/small.gif").await.unwrap());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_local_storage_never_overwrites() {
        let dir = std::env::temp_dir().join(format!("yatube-storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(dir.clone(), "/media".to_string());

        storage
            .upload("posts/small.gif", b"first", "image/gif")
            .await
            .unwrap();
        let second = storage
            .upload("posts/small.gif", b"second", "image/gif")
            .await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        let stored = tokio::fs::read(dir.join("posts/small.gif")).await.unwrap();
        assert_eq!(stored, b"first");

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
