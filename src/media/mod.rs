/// Media storage for voice submission attachments
///
/// Visitors can attach a photo and/or an audio clip to a submission.
/// Files are stored content-addressed and only the resulting reference
/// is kept on the submission row.
pub mod disk;
pub mod store;

pub use store::{MediaKind, MediaStore, MediaStoreConfig, StoredMedia};

use crate::error::EngageResult;
use async_trait::async_trait;

/// Media storage backend trait
///
/// Implementations handle the actual storage and retrieval of media
/// bytes; metadata bookkeeping lives in `MediaStore`.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Store a media object under its reference
    async fn put(&self, media_ref: &str, data: Vec<u8>) -> EngageResult<()>;

    /// Retrieve a media object by reference
    async fn get(&self, media_ref: &str) -> EngageResult<Option<Vec<u8>>>;

    /// Delete a media object by reference
    async fn delete(&self, media_ref: &str) -> EngageResult<()>;

    /// Check if a media object exists
    async fn exists(&self, media_ref: &str) -> EngageResult<bool>;
}
