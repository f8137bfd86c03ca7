/// Disk-based media storage backend
use crate::{
    error::{EngageError, EngageResult},
    media::MediaBackend,
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores media on the local filesystem with directory sharding based
/// on reference prefixes to prevent too many files in one directory.
#[derive(Clone)]
pub struct DiskMediaBackend {
    base_path: PathBuf,
}

impl DiskMediaBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a media reference
    ///
    /// Uses directory sharding: {base}/{first2chars}/{ref}
    fn media_path(&self, media_ref: &str) -> PathBuf {
        if media_ref.len() >= 2 {
            let shard = &media_ref[0..2];
            self.base_path.join(shard).join(media_ref)
        } else {
            self.base_path.join("_").join(media_ref)
        }
    }

    /// Ensure the directory for a media object exists
    async fn ensure_media_dir(&self, media_ref: &str) -> EngageResult<PathBuf> {
        let path = self.media_path(media_ref);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                EngageError::MediaStorage(format!("Failed to create media directory: {}", e))
            })?;
        }
        Ok(path)
    }
}

#[async_trait]
impl MediaBackend for DiskMediaBackend {
    async fn put(&self, media_ref: &str, data: Vec<u8>) -> EngageResult<()> {
        let path = self.ensure_media_dir(media_ref).await?;

        fs::write(&path, data).await.map_err(|e| {
            EngageError::MediaStorage(format!("Failed to write media {}: {}", media_ref, e))
        })?;

        Ok(())
    }

    async fn get(&self, media_ref: &str) -> EngageResult<Option<Vec<u8>>> {
        let path = self.media_path(media_ref);

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngageError::MediaStorage(format!(
                "Failed to read media {}: {}",
                media_ref, e
            ))),
        }
    }

    async fn delete(&self, media_ref: &str) -> EngageResult<()> {
        let path = self.media_path(media_ref);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngageError::MediaStorage(format!(
                "Failed to delete media {}: {}",
                media_ref, e
            ))),
        }
    }

    async fn exists(&self, media_ref: &str) -> EngageResult<bool> {
        Ok(self.media_path(media_ref).exists())
    }
}
