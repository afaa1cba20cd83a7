use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerHost,
    ServerPort,
    ApiBaseUrl,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    MinioRegion,
    StorageRootPrefix,
    WorkDir,
    FfmpegBin,
    EncodeWorkers,
    EncodeQueueCapacity,
    SubmitTimeoutSecs,
    PresignExpirySecs,
    ShutdownGraceSecs,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerHost => "APP_HOST",
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::ApiBaseUrl => "API_BASE_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_VIDEOS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::MinioRegion => "MINIO_REGION",
            EnvKey::StorageRootPrefix => "STORAGE_ROOT_PREFIX",
            EnvKey::WorkDir => "WORK_DIR",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::EncodeWorkers => "ENCODE_WORKERS",
            EnvKey::EncodeQueueCapacity => "ENCODE_QUEUE_CAPACITY",
            EnvKey::SubmitTimeoutSecs => "SUBMIT_TIMEOUT_SECS",
            EnvKey::PresignExpirySecs => "PRESIGN_EXPIRY_SECS",
            EnvKey::ShutdownGraceSecs => "SHUTDOWN_GRACE_SECS",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Like `get_parsed`, but an unset or unparsable variable yields `None`.
pub fn get_optional<T: FromStr>(key: EnvKey) -> Option<T> {
    get(key).ok().and_then(|val| val.parse::<T>().ok())
}
