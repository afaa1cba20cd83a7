use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::model::{
    EncodeJob, EncryptionKey, RenditionSpec, key_file_name, key_info_file_name, key_uri_placeholder,
};
use crate::workers::transcoder::{TranscodeEngine, TranscodeRequest};

#[derive(Debug, Clone)]
pub struct EncodedRendition {
    pub label: &'static str,
    pub playlist_path: PathBuf,
    /// Raw key file. Left on disk until it has been uploaded.
    pub key_path: PathBuf,
}

/// Drives one engine invocation per rendition and owns the key material.
#[derive(Clone)]
pub struct RenditionEncoder {
    engine: Arc<dyn TranscodeEngine>,
}

impl RenditionEncoder {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        Self { engine }
    }

    /// Encodes every rendition one after another. The first failure aborts
    /// the job; nothing is uploaded for a half-encoded video.
    pub async fn encode_all(
        &self,
        job: &EncodeJob,
        renditions: &[RenditionSpec],
        cancel: &CancellationToken,
    ) -> Result<Vec<EncodedRendition>> {
        let mut encoded = Vec::with_capacity(renditions.len());
        for spec in renditions {
            let rendition = self
                .encode_rendition(job, spec, cancel)
                .await
                .with_context(|| format!("encode rendition {}", spec.label))?;
            encoded.push(rendition);
        }
        Ok(encoded)
    }

    pub async fn encode_rendition(
        &self,
        job: &EncodeJob,
        spec: &RenditionSpec,
        cancel: &CancellationToken,
    ) -> Result<EncodedRendition> {
        let key = EncryptionKey::generate(spec.label);

        let key_path = job.output_dir.join(key_file_name(spec.label));
        tokio::fs::write(&key_path, key.key)
            .await
            .with_context(|| format!("write key file {}", key_path.display()))?;

        let key_info_path = job.output_dir.join(key_info_file_name(spec.label));
        tokio::fs::write(&key_info_path, key.key_info(&key_path))
            .await
            .with_context(|| format!("write key info {}", key_info_path.display()))?;

        let request = TranscodeRequest {
            input: job.input_path.clone(),
            output_dir: job.output_dir.clone(),
            rendition: *spec,
            key_info_path: key_info_path.clone(),
        };

        info!(video_id = %job.video_id, label = spec.label, "Encoding rendition");
        let outcome = self.engine.transcode(&request, cancel).await;

        // The descriptor is scratch whatever the outcome; the key file is not.
        if let Err(e) = tokio::fs::remove_file(&key_info_path).await {
            warn!(path = %key_info_path.display(), error = %e, "Failed to remove key info file");
        }
        outcome.context("transcoder run failed")?;

        let playlist_path = request.playlist_path();
        let playlist = tokio::fs::read_to_string(&playlist_path)
            .await
            .with_context(|| format!("read playlist {}", playlist_path.display()))?;

        let rewritten = rewrite_key_uri(
            &playlist,
            &key_uri_placeholder(spec.label),
            &job.key_uri(spec.label),
        );
        tokio::fs::write(&playlist_path, rewritten)
            .await
            .with_context(|| format!("write playlist {}", playlist_path.display()))?;

        info!(video_id = %job.video_id, label = spec.label, "Rendition encoded");
        Ok(EncodedRendition {
            label: spec.label,
            playlist_path,
            key_path,
        })
    }
}

/// Swaps the engine's placeholder key URI for the proxy URL. Line structure
/// is untouched.
pub fn rewrite_key_uri(playlist: &str, placeholder: &str, key_uri: &str) -> String {
    playlist.replace(placeholder, key_uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::encode::model::RENDITIONS;
    use crate::workers::transcoder::fake::FakeEngine;
    use std::path::Path;
    use uuid::Uuid;

    fn job(dir: &Path) -> EncodeJob {
        EncodeJob {
            job_id: Uuid::new_v4(),
            video_id: "sample".into(),
            input_path: dir.join("sample.mp4"),
            output_dir: dir.join("output/sample"),
            storage_prefix: "courses/sample".into(),
            api_base_url: "http://api".into(),
        }
    }

    #[test]
    fn rewrite_keeps_line_count() {
        let playlist = "#EXTM3U\r\n#EXT-X-KEY:METHOD=AES-128,URI=\"__REPLACE_ME_URI_360p__\"\r\n#EXTINF:4.0,\r\n360p_000.ts\r\n";
        let rewritten = rewrite_key_uri(
            playlist,
            "__REPLACE_ME_URI_360p__",
            "http://api/videos/sample/keys/enc_360p.key",
        );

        assert_eq!(playlist.lines().count(), rewritten.lines().count());
        assert!(rewritten.contains("URI=\"http://api/videos/sample/keys/enc_360p.key\"\r\n"));
        assert!(!rewritten.contains("__REPLACE_ME_URI_"));
    }

    #[tokio::test]
    async fn encodes_every_rendition_with_its_own_key() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        tokio::fs::create_dir_all(&job.output_dir).await.unwrap();

        let engine = Arc::new(FakeEngine::new());
        let encoder = RenditionEncoder::new(engine.clone());
        let encoded = encoder
            .encode_all(&job, &RENDITIONS, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(encoded.len(), RENDITIONS.len());
        assert_eq!(engine.calls.lock().unwrap().len(), RENDITIONS.len());

        let mut keys = Vec::new();
        for rendition in &encoded {
            let key = std::fs::read(&rendition.key_path).unwrap();
            assert_eq!(key.len(), 16);
            keys.push(key);

            let playlist = std::fs::read_to_string(&rendition.playlist_path).unwrap();
            assert!(playlist.contains(&format!(
                "URI=\"http://api/videos/sample/keys/enc_{}.key\"",
                rendition.label
            )));
            assert!(!job.output_dir.join(key_info_file_name(rendition.label)).exists());
        }
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), RENDITIONS.len());
    }

    #[tokio::test]
    async fn engine_failure_aborts_remaining_renditions() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        tokio::fs::create_dir_all(&job.output_dir).await.unwrap();

        let engine = Arc::new(FakeEngine::failing_on("480p"));
        let encoder = RenditionEncoder::new(engine.clone());
        let err = encoder
            .encode_all(&job, &RENDITIONS, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("480p"));
        // 360p and the failing 480p; 720p and 1080p never start.
        assert_eq!(engine.calls.lock().unwrap().len(), 2);
        assert!(!job.output_dir.join("keyinfo_480p.txt").exists());
        assert!(job.output_dir.join("enc_480p.key").exists());
    }
}
