/// Media store manager
///
/// Coordinates the storage backend with database metadata tracking.
/// References are content-addressed (SHA-256 of the bytes), so storing
/// the same file twice is naturally idempotent.
use crate::{
    error::{EngageError, EngageResult},
    media::{disk::DiskMediaBackend, MediaBackend},
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

/// Kind of media attached to a voice submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn allowed_mime(&self, mime_type: &str) -> bool {
        match self {
            MediaKind::Image => matches!(
                mime_type,
                "image/jpeg" | "image/png" | "image/gif" | "image/webp"
            ),
            MediaKind::Audio => matches!(
                mime_type,
                "audio/mpeg" | "audio/ogg" | "audio/wav" | "audio/webm" | "audio/mp4"
            ),
        }
    }
}

/// A stored media object
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub media_ref: String,
    pub mime_type: String,
    pub size: usize,
}

/// Media store configuration
#[derive(Debug, Clone)]
pub struct MediaStoreConfig {
    pub directory: PathBuf,
    /// Maximum media size in bytes
    pub max_size: usize,
}

impl Default for MediaStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data/media"),
            max_size: 10 * 1024 * 1024,
        }
    }
}

/// Main media store manager
#[derive(Clone)]
pub struct MediaStore {
    config: MediaStoreConfig,
    backend: Arc<dyn MediaBackend>,
    db: SqlitePool,
}

impl MediaStore {
    /// Create a media store over the disk backend
    pub fn new(config: MediaStoreConfig, db: SqlitePool) -> Self {
        let backend: Arc<dyn MediaBackend> =
            Arc::new(DiskMediaBackend::new(config.directory.clone()));
        Self {
            config,
            backend,
            db,
        }
    }

    /// Store a media object and return its reference
    ///
    /// The bytes are durably written before the reference is returned;
    /// a submission that fails later leaves at worst an orphaned media
    /// object, never a submission row pointing at missing media.
    pub async fn store(
        &self,
        kind: MediaKind,
        data: Vec<u8>,
        mime_type: &str,
        creator_actor_id: &str,
    ) -> EngageResult<StoredMedia> {
        if data.is_empty() {
            return Err(EngageError::InvalidInput("Media payload is empty".to_string()));
        }
        if data.len() > self.config.max_size {
            return Err(EngageError::InvalidInput(format!(
                "Media exceeds maximum size of {} bytes",
                self.config.max_size
            )));
        }
        if !kind.allowed_mime(mime_type) {
            return Err(EngageError::InvalidInput(format!(
                "Unsupported media type: {}",
                mime_type
            )));
        }

        // Probe image dimensions; also rejects byte blobs that claim to
        // be images but are not decodable.
        let (width, height) = match kind {
            MediaKind::Image => {
                let img = image::load_from_memory(&data).map_err(|e| {
                    EngageError::InvalidInput(format!("Unreadable image: {}", e))
                })?;
                (Some(img.width() as i64), Some(img.height() as i64))
            }
            MediaKind::Audio => (None, None),
        };

        let media_ref = Self::content_ref(&data);
        let size = data.len();

        self.backend.put(&media_ref, data).await?;

        sqlx::query(
            r#"
            INSERT INTO media_objects (ref, mime_type, size, width, height, creator_actor_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (ref) DO NOTHING
            "#,
        )
        .bind(&media_ref)
        .bind(mime_type)
        .bind(size as i64)
        .bind(width)
        .bind(height)
        .bind(creator_actor_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        tracing::debug!("Stored {:?} media {} ({} bytes)", kind, media_ref, size);

        Ok(StoredMedia {
            media_ref,
            mime_type: mime_type.to_string(),
            size,
        })
    }

    /// Retrieve media bytes by reference
    pub async fn get(&self, media_ref: &str) -> EngageResult<Option<Vec<u8>>> {
        self.backend.get(media_ref).await
    }

    /// Best-effort removal of a media object and its metadata
    ///
    /// Used when a moderator deletes a submission. Failures are logged
    /// and swallowed; orphaned objects are acceptable.
    pub async fn delete_best_effort(&self, media_ref: &str) {
        if let Err(e) = self.backend.delete(media_ref).await {
            tracing::warn!("Failed to delete media object {}: {}", media_ref, e);
        }
        if let Err(e) = sqlx::query("DELETE FROM media_objects WHERE ref = ?")
            .bind(media_ref)
            .execute(&self.db)
            .await
        {
            tracing::warn!("Failed to delete media metadata {}: {}", media_ref, e);
        }
    }

    /// SHA-256 content reference, hex encoded
    fn content_ref(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use tempfile::tempdir;

    fn store_with(dir: &tempfile::TempDir, db: SqlitePool) -> MediaStore {
        MediaStore::new(
            MediaStoreConfig {
                directory: dir.path().to_path_buf(),
                max_size: 1024 * 1024,
            },
            db,
        )
    }

    fn tiny_png() -> Vec<u8> {
        // 1x1 white pixel, encoded through the image crate itself
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255]));
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_store_audio_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_with(&dir, test_pool().await);

        let data = b"fake audio bytes".to_vec();
        let stored = store
            .store(MediaKind::Audio, data.clone(), "audio/ogg", "actor-1")
            .await
            .unwrap();

        assert_eq!(stored.size, data.len());
        assert_eq!(store.get(&stored.media_ref).await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_store_image_records_dimensions() {
        let dir = tempdir().unwrap();
        let db = test_pool().await;
        let store = store_with(&dir, db.clone());

        let stored = store
            .store(MediaKind::Image, tiny_png(), "image/png", "actor-1")
            .await
            .unwrap();

        let (width, height): (i64, i64) =
            sqlx::query_as("SELECT width, height FROM media_objects WHERE ref = ?")
                .bind(&stored.media_ref)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!((width, height), (1, 1));
    }

    #[tokio::test]
    async fn test_undecodable_image_rejected() {
        let dir = tempdir().unwrap();
        let store = store_with(&dir, test_pool().await);

        let result = store
            .store(
                MediaKind::Image,
                b"not an image".to_vec(),
                "image/png",
                "actor-1",
            )
            .await;
        assert!(matches!(result, Err(EngageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected() {
        let dir = tempdir().unwrap();
        let store = store_with(&dir, test_pool().await);

        let result = store
            .store(
                MediaKind::Audio,
                b"zip bytes".to_vec(),
                "application/zip",
                "actor-1",
            )
            .await;
        assert!(matches!(result, Err(EngageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_oversized_media_rejected() {
        let dir = tempdir().unwrap();
        let db = test_pool().await;
        let store = MediaStore::new(
            MediaStoreConfig {
                directory: dir.path().to_path_buf(),
                max_size: 8,
            },
            db,
        );

        let result = store
            .store(
                MediaKind::Audio,
                b"way too many bytes".to_vec(),
                "audio/ogg",
                "actor-1",
            )
            .await;
        assert!(matches!(result, Err(EngageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_best_effort_is_quiet() {
        let dir = tempdir().unwrap();
        let store = store_with(&dir, test_pool().await);

        let stored = store
            .store(MediaKind::Audio, b"bytes".to_vec(), "audio/wav", "actor-1")
            .await
            .unwrap();

        store.delete_best_effort(&stored.media_ref).await;
        assert_eq!(store.get(&stored.media_ref).await.unwrap(), None);

        // Second delete of the same ref must not panic or error
        store.delete_best_effort(&stored.media_ref).await;
    }
}
