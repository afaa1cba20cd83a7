use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error};

use super::manifest::{PLAYLIST_EXTENSION, Playlist};
use super::repository::{VideoLocation, VideoRepository};
use crate::common::response::AppError;
use crate::common::upload::is_safe_name;
use crate::infrastructure::storage::{ObjectStorage, StorageError};
use crate::modules::encode::model::KEY_FILE_SUFFIX;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Internal(StorageError),
}

impl From<StorageError> for PlaybackError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(key) => PlaybackError::NotFound(key),
            other => PlaybackError::Internal(other),
        }
    }
}

impl From<PlaybackError> for AppError {
    fn from(e: PlaybackError) -> Self {
        match e {
            PlaybackError::NotFound(_) => AppError::NotFound("Requested video not found".to_string()),
            PlaybackError::Internal(e) => {
                error!("Playback storage failure: {}", e);
                AppError::Internal(e.to_string())
            }
        }
    }
}

/// Read path: playlists with signed segment URLs, and the key proxy.
#[derive(Clone)]
pub struct PlaybackService {
    storage: Arc<dyn ObjectStorage>,
    videos: VideoRepository,
    presign_expiry: Duration,
}

impl PlaybackService {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        videos: VideoRepository,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            storage,
            videos,
            presign_expiry,
        }
    }

    async fn locate(&self, video_id: &str) -> Result<VideoLocation, PlaybackError> {
        self.videos
            .find(video_id)
            .await?
            .ok_or_else(|| PlaybackError::NotFound(format!("video {}", video_id)))
    }

    /// Returns the stored playlist with every segment line replaced by a
    /// presigned URL. Key directives and other tags are left as stored.
    pub async fn manifest(&self, video_id: &str, playlist: &str) -> Result<String, PlaybackError> {
        if !is_safe_name(playlist) || !playlist.ends_with(PLAYLIST_EXTENSION) {
            return Err(PlaybackError::NotFound(playlist.to_string()));
        }
        let location = self.locate(video_id).await?;

        let raw = self.storage.get_object(&location.object_key(playlist)).await?;
        let raw = String::from_utf8_lossy(&raw);
        let parsed = Playlist::parse(&raw);

        let mut urls = Vec::new();
        for segment in parsed.segments() {
            let url = self
                .storage
                .presign_get(&location.object_key(segment), self.presign_expiry)
                .await?;
            urls.push(url);
        }

        debug!(video_id, playlist, lines = parsed.line_count(), segments = urls.len(), "Serving playlist");
        Ok(parsed.render(&urls))
    }

    /// Raw key bytes from `<prefix>/secrets/<key_name>`. Only exact key file
    /// names are looked up.
    pub async fn key(&self, video_id: &str, key_name: &str) -> Result<Bytes, PlaybackError> {
        if !is_safe_name(key_name) || !key_name.ends_with(KEY_FILE_SUFFIX) {
            return Err(PlaybackError::NotFound(key_name.to_string()));
        }
        let location = self.locate(video_id).await?;

        Ok(self.storage.get_object(&location.secret_key(key_name)).await?)
    }
}
