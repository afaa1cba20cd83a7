use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::config::settings::AppConfig;

/// One packaging request, created when an upload finishes and consumed once
/// by a worker.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeJob {
    pub job_id: Uuid,
    pub video_id: String,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub storage_prefix: String,
    pub api_base_url: String,
}

impl EncodeJob {
    /// Local scratch paths carry the job id so two uploads of the same video
    /// never share an input file or output directory. The storage prefix is
    /// per video; the last job to publish wins.
    pub fn new(video_id: &str, extension: &str, config: &AppConfig) -> Self {
        let job_id = Uuid::new_v4();
        let scratch = format!("{}-{}", video_id, job_id);
        Self {
            job_id,
            video_id: video_id.to_string(),
            input_path: config
                .uploads_dir()
                .join(format!("{}.{}", scratch, extension)),
            output_dir: config.outputs_dir().join(scratch),
            storage_prefix: storage_prefix(&config.storage_root_prefix, video_id),
            api_base_url: config.api_base_url.clone(),
        }
    }

    /// Proxy URL baked into the rendition playlist in place of the raw key file.
    pub fn key_uri(&self, label: &str) -> String {
        format!(
            "{}/videos/{}/keys/{}",
            self.api_base_url.trim_end_matches('/'),
            self.video_id,
            key_file_name(label)
        )
    }
}

pub fn storage_prefix(root: &str, video_id: &str) -> String {
    if root.is_empty() {
        video_id.to_string()
    } else {
        format!("{}/{}", root, video_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionSpec {
    pub label: &'static str,
    pub bitrate: &'static str,
    pub width: u32,
    pub height: u32,
    /// Advertised in the master playlist's `BANDWIDTH` attribute.
    pub bandwidth: u64,
}

impl RenditionSpec {
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.label)
    }

    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.ts", self.label)
    }

    pub fn scale_filter(&self) -> String {
        format!("scale=w={}:h={}", self.width, self.height)
    }
}

/// Renditions produced for every upload, in master playlist order.
pub const RENDITIONS: [RenditionSpec; 4] = [
    RenditionSpec {
        label: "360p",
        bitrate: "500k",
        width: 480,
        height: 360,
        bandwidth: 800_000,
    },
    RenditionSpec {
        label: "480p",
        bitrate: "1000k",
        width: 858,
        height: 480,
        bandwidth: 1_400_000,
    },
    RenditionSpec {
        label: "720p",
        bitrate: "2000k",
        width: 1280,
        height: 720,
        bandwidth: 2_800_000,
    },
    RenditionSpec {
        label: "1080p",
        bitrate: "4000k",
        width: 1920,
        height: 1080,
        bandwidth: 5_000_000,
    },
];

pub const KEY_FILE_SUFFIX: &str = ".key";

pub fn key_file_name(label: &str) -> String {
    format!("enc_{}{}", label, KEY_FILE_SUFFIX)
}

pub fn key_info_file_name(label: &str) -> String {
    format!("keyinfo_{}.txt", label)
}

pub fn key_uri_placeholder(label: &str) -> String {
    format!("__REPLACE_ME_URI_{}__", label)
}

/// AES-128 key and IV for one rendition of one job. Never reused.
pub struct EncryptionKey {
    pub label: String,
    pub key: [u8; 16],
    pub iv: [u8; 16],
}

impl EncryptionKey {
    pub fn generate(label: &str) -> Self {
        Self {
            label: label.to_string(),
            key: rand::random(),
            iv: rand::random(),
        }
    }

    pub fn iv_hex(&self) -> String {
        hex::encode(self.iv)
    }

    /// Three-line descriptor read by the engine's `-hls_key_info_file`.
    pub fn key_info(&self, key_path: &Path) -> String {
        format!(
            "{}\n{}\n{}",
            key_uri_placeholder(&self.label),
            key_path.display(),
            self.iv_hex()
        )
    }
}

// Keys must not leak into logs.
impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
