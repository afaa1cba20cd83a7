use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectStorage, StorageError, StorageResult};

/// Map-backed store for tests. Presigned URLs carry a counter in place of a
/// signature so two presigns of the same key differ.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    fail_put_suffix: Mutex<Option<String>>,
    signatures: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later `put_object` whose key ends with `suffix` fails.
    pub fn fail_puts_ending_with(&self, suffix: &str) {
        *self.fail_put_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            (body.into(), mime::APPLICATION_OCTET_STREAM.to_string()),
        );
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|(b, _)| b.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        if let Some(suffix) = self.fail_put_suffix.lock().unwrap().as_deref() {
            if key.ends_with(suffix) {
                return Err(StorageError::UploadFailed {
                    key: key.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let signature = self.signatures.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "http://minio.test/bucket/{}?X-Amz-Expires={}&X-Amz-Signature={:08x}",
            key,
            expires_in.as_secs(),
            signature
        ))
    }

    async fn list_prefix(&self, prefix: &str, limit: usize) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect())
    }
}
