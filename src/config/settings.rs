use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::env::{self, EnvKey};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("{0} is not an absolute http(s) URL: {1}")]
    InvalidUrl(&'static str, String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must be between {1} and {2}")]
    OutOfRange(&'static str, u64, u64),
}

/// SigV4 presigned URLs cannot outlive seven days.
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Base URL clients use to reach this service, without a trailing slash.
    pub api_base_url: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_region: String,
    pub storage_root_prefix: String,
    pub work_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub encode_workers: usize,
    pub encode_queue_capacity: usize,
    pub submit_timeout: Option<Duration>,
    pub presign_expiry: Duration,
    pub shutdown_grace: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let required = |key: EnvKey| {
            let name = key.as_str();
            env::get(key).map_err(|_| ConfigError::Missing(name))
        };

        let api_base_url = normalize_base_url(&required(EnvKey::ApiBaseUrl)?)?;

        let config = Self {
            server_host: env::get_or(EnvKey::ServerHost, "0.0.0.0"),
            server_port: env::get_parsed(EnvKey::ServerPort, 5000),
            api_base_url,
            minio_url: required(EnvKey::MinioUrl)?,
            minio_bucket: required(EnvKey::MinioBucket)?,
            minio_access_key: required(EnvKey::MinioAccessKey)?,
            minio_secret_key: required(EnvKey::MinioSecretKey)?,
            minio_region: env::get_or(EnvKey::MinioRegion, "us-east-1"),
            storage_root_prefix: env::get_or(EnvKey::StorageRootPrefix, "courses")
                .trim_matches('/')
                .to_string(),
            work_dir: PathBuf::from(env::get_or(EnvKey::WorkDir, "tmp")),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            encode_workers: env::get_parsed(EnvKey::EncodeWorkers, 1),
            encode_queue_capacity: env::get_parsed(EnvKey::EncodeQueueCapacity, 2),
            submit_timeout: env::get_optional::<u64>(EnvKey::SubmitTimeoutSecs)
                .map(Duration::from_secs),
            presign_expiry: Duration::from_secs(env::get_parsed(EnvKey::PresignExpirySecs, 3600)),
            shutdown_grace: Duration::from_secs(env::get_parsed(EnvKey::ShutdownGraceSecs, 30)),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 2 * 1024 * 1024 * 1024),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.encode_workers == 0 {
            return Err(ConfigError::Zero(EnvKey::EncodeWorkers.as_str()));
        }
        if self.encode_queue_capacity == 0 {
            return Err(ConfigError::Zero(EnvKey::EncodeQueueCapacity.as_str()));
        }
        let expiry = self.presign_expiry.as_secs();
        if !(1..=MAX_PRESIGN_EXPIRY_SECS).contains(&expiry) {
            return Err(ConfigError::OutOfRange(
                EnvKey::PresignExpirySecs.as_str(),
                1,
                MAX_PRESIGN_EXPIRY_SECS,
            ));
        }
        Ok(())
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.work_dir.join("uploads")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.work_dir.join("output")
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let name = EnvKey::ApiBaseUrl.as_str();
    let parsed = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(name, raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(name, raw.to_string()));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
