use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::dispatcher::JobDispatcher;
use crate::infrastructure::storage::ObjectStorage;
use crate::modules::playback::repository::VideoRepository;
use crate::modules::playback::service::PlaybackService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub dispatcher: JobDispatcher,
    pub playback: PlaybackService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStorage>,
        dispatcher: JobDispatcher,
    ) -> Self {
        let videos = VideoRepository::new(storage.clone(), &config.storage_root_prefix);
        let playback = PlaybackService::new(storage, videos, config.presign_expiry);
        Self {
            config,
            dispatcher,
            playback,
        }
    }
}
