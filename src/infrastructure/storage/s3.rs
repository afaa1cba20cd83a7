use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::{debug, error, info};

use super::{ObjectStorage, StorageError, StorageResult};

#[derive(Clone)]
pub struct StorageService {
    client: Client,
    bucket: String,
    region: String,
}

impl StorageService {
    pub fn new(
        endpoint: &str,
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: bucket.to_string(),
            region: region.to_string(),
        }
    }

    /// Creates the bucket when it does not exist yet.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            info!("✅ Bucket already exists: {}", self.bucket);
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::Config(format!("create bucket {}: {}", self.bucket, e)))?;

        info!("✅ Created bucket: {}", self.bucket);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for StorageService {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        let size = body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = %e, "S3 upload failed");
                StorageError::UploadFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        debug!(bucket = %self.bucket, key = %key, size_bytes = size, "S3 upload successful");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::NotFound(key.to_string())
                } else {
                    error!(bucket = %self.bucket, key = %key, error = %e, "S3 download failed");
                    StorageError::DownloadFailed {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(data.into_bytes())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_failed = |reason: String| StorageError::PresignFailed {
            key: key.to_string(),
            reason,
        };

        let presign_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| presign_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn list_prefix(&self, prefix: &str, limit: usize) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let remaining = limit.saturating_sub(keys.len());
            if remaining == 0 {
                break;
            }

            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .max_keys(remaining.min(1000) as i32);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| StorageError::ListFailed {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        keys.truncate(limit);
        Ok(keys)
    }
}
