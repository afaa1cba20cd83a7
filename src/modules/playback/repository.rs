use std::sync::Arc;

use crate::common::upload::is_safe_name;
use crate::infrastructure::storage::{ObjectStorage, StorageResult};
use crate::modules::encode::model::storage_prefix;
use crate::modules::encode::publish::SECRETS_DIR;

/// Storage location of one packaged video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLocation {
    pub prefix: String,
}

impl VideoLocation {
    pub fn object_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.prefix, file_name)
    }

    pub fn secret_key(&self, file_name: &str) -> String {
        format!("{}/{}/{}", self.prefix, SECRETS_DIR, file_name)
    }
}

/// Maps a video id to its storage prefix. A video exists once at least one
/// object has been published under that prefix.
#[derive(Clone)]
pub struct VideoRepository {
    storage: Arc<dyn ObjectStorage>,
    root_prefix: String,
}

impl VideoRepository {
    pub fn new(storage: Arc<dyn ObjectStorage>, root_prefix: &str) -> Self {
        Self {
            storage,
            root_prefix: root_prefix.to_string(),
        }
    }

    pub async fn find(&self, video_id: &str) -> StorageResult<Option<VideoLocation>> {
        if !is_safe_name(video_id) {
            return Ok(None);
        }

        let prefix = storage_prefix(&self.root_prefix, video_id);
        let video_dir = format!("{}/", prefix);
        let found = self.storage.list_prefix(&video_dir, 1).await?;

        Ok((!found.is_empty()).then_some(VideoLocation { prefix }))
    }
}
