use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::modules::encode::model::RenditionSpec;

/// Lines of engine stderr kept for the failure message.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with status {code:?}: {stderr_tail}")]
    Failed {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("transcode cancelled by shutdown")]
    Cancelled,

    #[error("transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the engine needs to produce one encrypted rendition.
#[derive(Debug, Clone)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub rendition: RenditionSpec,
    pub key_info_path: PathBuf,
}

impl TranscodeRequest {
    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(self.rendition.playlist_name())
    }

    pub fn segment_pattern(&self) -> PathBuf {
        self.output_dir.join(self.rendition.segment_pattern())
    }

    pub fn ffmpeg_args(&self) -> Vec<String> {
        let path = |p: PathBuf| p.to_string_lossy().to_string();
        vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-vf".to_string(),
            self.rendition.scale_filter(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:v".to_string(),
            self.rendition.bitrate.to_string(),
            "-hls_time".to_string(),
            "4".to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            path(self.segment_pattern()),
            "-hls_key_info_file".to_string(),
            self.key_info_path.to_string_lossy().to_string(),
            path(self.playlist_path()),
        ]
    }
}

#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Runs to completion, or until `cancel` fires, in which case the engine
    /// process is killed and `TranscodeError::Cancelled` returned.
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError>;
}

pub struct FfmpegEngine {
    binary: String,
}

impl FfmpegEngine {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        cancel: &CancellationToken,
    ) -> Result<(), TranscodeError> {
        if cancel.is_cancelled() {
            return Err(TranscodeError::Cancelled);
        }

        let args = request.ffmpeg_args();
        debug!("Running: {} {}", self.binary, args.join(" "));

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => {
                warn!(label = request.rendition.label, "Shutdown grace elapsed, killing transcoder");
                return Err(TranscodeError::Cancelled);
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(TranscodeError::Failed {
                code: output.status.code(),
                stderr_tail: stderr_tail(&output.stderr),
            })
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::encode::model::RENDITIONS;

    fn request() -> TranscodeRequest {
        TranscodeRequest {
            input: PathBuf::from("/work/uploads/sample.mp4"),
            output_dir: PathBuf::from("/work/output/sample"),
            rendition: RENDITIONS[2],
            key_info_path: PathBuf::from("/work/output/sample/keyinfo_720p.txt"),
        }
    }

    #[test]
    fn args_follow_engine_contract() {
        let args = request().ffmpeg_args();
        let joined = args.join(" ");

        assert!(joined.contains("-i /work/uploads/sample.mp4"));
        assert!(joined.contains("-vf scale=w=1280:h=720"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-b:v 2000k"));
        assert!(joined.contains("-hls_time 4"));
        assert!(joined.contains("-hls_playlist_type vod"));
        assert!(joined.contains("-hls_segment_filename /work/output/sample/720p_%03d.ts"));
        assert!(joined.contains("-hls_key_info_file /work/output/sample/keyinfo_720p.txt"));
        assert_eq!(args.last().unwrap(), "/work/output/sample/720p.m3u8");
    }

    #[tokio::test]
    async fn cancelled_token_never_spawns() {
        let engine = FfmpegEngine::new("/nonexistent/ffmpeg");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine.transcode(&request(), &cancel).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Cancelled));
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let engine = FfmpegEngine::new("/nonexistent/ffmpeg");
        let err = engine
            .transcode(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let engine = FfmpegEngine::new("false");
        let err = engine
            .transcode(&request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Failed { code: Some(1), .. }));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 30"));
        assert!(tail.ends_with("line 49"));
    }
}
