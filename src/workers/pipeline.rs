use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::infrastructure::queue::dispatcher::JobHandler;
use crate::infrastructure::storage::ObjectStorage;
use crate::modules::encode::master::write_master_playlist;
use crate::modules::encode::model::{EncodeJob, RENDITIONS};
use crate::modules::encode::publish::publish_output;
use crate::modules::encode::rendition::RenditionEncoder;
use crate::workers::transcoder::TranscodeEngine;

/// Encode → master playlist → upload, for one job at a time.
pub struct EncodePipeline {
    storage: Arc<dyn ObjectStorage>,
    encoder: RenditionEncoder,
}

impl EncodePipeline {
    pub fn new(storage: Arc<dyn ObjectStorage>, engine: Arc<dyn TranscodeEngine>) -> Self {
        Self {
            storage,
            encoder: RenditionEncoder::new(engine),
        }
    }

    pub async fn run(&self, job: &EncodeJob, cancel: &CancellationToken) -> Result<()> {
        info!(video_id = %job.video_id, input = %job.input_path.display(), "Processing job");

        prepare_output_dir(&job.output_dir).await?;

        if let Err(e) = self.package(job, cancel).await {
            // Nothing was uploaded; raw keys and partial segments go with it.
            discard_output_dir(job).await;
            return Err(e);
        }

        // On failure the tree stays on disk for inspection.
        publish_output(self.storage.as_ref(), job)
            .await
            .context("upload stage")?;

        if let Err(e) = tokio::fs::remove_file(&job.input_path).await {
            warn!(video_id = %job.video_id, error = %e, "Failed to remove uploaded source");
        }
        Ok(())
    }

    async fn package(&self, job: &EncodeJob, cancel: &CancellationToken) -> Result<()> {
        self.encoder
            .encode_all(job, &RENDITIONS, cancel)
            .await
            .context("encode stage")?;

        write_master_playlist(&job.output_dir, &RENDITIONS)
            .await
            .context("write master playlist")?;
        Ok(())
    }
}

/// Starts the job from an empty directory so only this run's files are
/// published.
async fn prepare_output_dir(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => warn!(path = %dir.display(), "Removed stale output directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("clear {}", dir.display())),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create {}", dir.display()))
}

async fn discard_output_dir(job: &EncodeJob) {
    if let Err(e) = tokio::fs::remove_dir_all(&job.output_dir).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(video_id = %job.video_id, error = %e, "Failed to remove output directory");
        }
    }
}

#[async_trait]
impl JobHandler for EncodePipeline {
    async fn handle(&self, job: EncodeJob, cancel: CancellationToken) -> Result<()> {
        self.run(&job, &cancel).await
    }
}
