use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::model::{EncodeJob, KEY_FILE_SUFFIX};
use crate::infrastructure::storage::ObjectStorage;

pub const SECRETS_DIR: &str = "secrets";

/// Where an artifact from the output tree goes in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Raw key, isolated under `<prefix>/secrets/`.
    Key { path: PathBuf, name: String },
    /// Playlists and segments, mirrored under `<prefix>/`.
    Media { path: PathBuf, relative: String },
}

impl Artifact {
    pub fn classify(root: &Path, path: &Path) -> Result<Self> {
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("non UTF-8 file name: {}", path.display()))?;

        if name.ends_with(KEY_FILE_SUFFIX) {
            return Ok(Artifact::Key {
                path: path.to_path_buf(),
                name: name.to_string(),
            });
        }

        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok(Artifact::Media {
            path: path.to_path_buf(),
            relative,
        })
    }

    pub fn storage_key(&self, prefix: &str) -> String {
        match self {
            Artifact::Key { name, .. } => format!("{}/{}/{}", prefix, SECRETS_DIR, name),
            Artifact::Media { relative, .. } => format!("{}/{}", prefix, relative),
        }
    }

    pub fn local_path(&self) -> &Path {
        match self {
            Artifact::Key { path, .. } | Artifact::Media { path, .. } => path,
        }
    }
}

fn collect_artifacts(root: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if entry.file_type().is_file() {
            artifacts.push(Artifact::classify(root, entry.path())?);
        }
    }
    Ok(artifacts)
}

/// Uploads the whole output tree, then deletes it. Any failed upload fails
/// the stage and leaves the tree on disk.
pub async fn publish_output(storage: &dyn ObjectStorage, job: &EncodeJob) -> Result<usize> {
    let root = job.output_dir.clone();
    let artifacts = tokio::task::spawn_blocking(move || collect_artifacts(&root))
        .await
        .context("artifact scan panicked")??;

    for artifact in &artifacts {
        let key = artifact.storage_key(&job.storage_prefix);
        let data = tokio::fs::read(artifact.local_path())
            .await
            .with_context(|| format!("read {}", artifact.local_path().display()))?;

        debug!(video_id = %job.video_id, key = %key, "Uploading artifact");
        storage
            .put_object(
                &key,
                Bytes::from(data),
                mime::APPLICATION_OCTET_STREAM.as_ref(),
            )
            .await
            .with_context(|| format!("upload {}", key))?;
    }

    tokio::fs::remove_dir_all(&job.output_dir)
        .await
        .with_context(|| format!("remove {}", job.output_dir.display()))?;

    info!(
        video_id = %job.video_id,
        objects = artifacts.len(),
        prefix = %job.storage_prefix,
        "Output published"
    );
    Ok(artifacts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::InMemoryStorage;
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

    fn write_tree(root: &Path) {
        std::fs::create_dir_all(root.join("extra")).unwrap();
        std::fs::write(root.join("360p.m3u8"), "#EXTM3U\n").unwrap();
        std::fs::write(root.join("360p_000.ts"), b"seg").unwrap();
        std::fs::write(root.join("enc_360p.key"), [7u8; 16]).unwrap();
        std::fs::write(root.join("extra/notes.txt"), "n").unwrap();
    }

    #[test]
    fn keys_are_routed_to_secrets() {
        let root = Path::new("/out/sample");
        let key = Artifact::classify(root, &root.join("enc_720p.key")).unwrap();
        let segment = Artifact::classify(root, &root.join("720p_003.ts")).unwrap();
        let nested = Artifact::classify(root, &root.join("a/b.m3u8")).unwrap();

        assert_eq!(key.storage_key("courses/x"), "courses/x/secrets/enc_720p.key");
        assert_eq!(segment.storage_key("courses/x"), "courses/x/720p_003.ts");
        assert_eq!(nested.storage_key("courses/x"), "courses/x/a/b.m3u8");
    }

    #[tokio::test]
    async fn publishes_tree_and_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        write_tree(&job.output_dir);
        let storage = InMemoryStorage::new();

        let count = publish_output(&storage, &job).await.unwrap();

        assert_eq!(count, 4);
        assert_eq!(
            storage.keys(),
            vec![
                "courses/sample/360p.m3u8",
                "courses/sample/360p_000.ts",
                "courses/sample/extra/notes.txt",
                "courses/sample/secrets/enc_360p.key",
            ]
        );
        assert_eq!(
            storage.content_type("courses/sample/360p.m3u8").as_deref(),
            Some("application/octet-stream")
        );
        assert!(!job.output_dir.exists());
    }

    #[tokio::test]
    async fn failed_upload_keeps_local_tree() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        write_tree(&job.output_dir);
        let storage = InMemoryStorage::new();
        storage.fail_puts_ending_with(".key");

        let err = publish_output(&storage, &job).await.unwrap_err();

        assert!(format!("{:#}", err).contains("secrets/enc_360p.key"));
        assert!(job.output_dir.join("enc_360p.key").exists());
        assert!(job.output_dir.join("360p_000.ts").exists());
    }
}
