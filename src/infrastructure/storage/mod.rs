use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("upload of {key} failed: {reason}")]
    UploadFailed { key: String, reason: String },

    #[error("download of {key} failed: {reason}")]
    DownloadFailed { key: String, reason: String },

    #[error("presign of {key} failed: {reason}")]
    PresignFailed { key: String, reason: String },

    #[error("listing {prefix} failed: {reason}")]
    ListFailed { prefix: String, reason: String },

    #[error("storage misconfigured: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Narrow view of the object store that the pipeline and the read path need.
///
/// Keys are bucket-relative (`courses/<video>/360p.m3u8`); the bucket is a
/// property of the implementation.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    /// Fetch a whole object. A missing key is `StorageError::NotFound`.
    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    /// Time-limited GET URL for `key`. Does not check that the object exists.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Up to `limit` keys starting with `prefix`.
    async fn list_prefix(&self, prefix: &str, limit: usize) -> StorageResult<Vec<String>>;
}
