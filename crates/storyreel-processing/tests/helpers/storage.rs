//! In-memory object store with failure injection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use storyreel_storage::keys::{key_from_public_url, validate_key};
use storyreel_storage::{ObjectMetadata, Storage, StorageBackend, StorageError, StorageResult};

pub const MOCK_BASE_URL: &str = "https://bucket.example.com";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub metadata: Vec<(&'static str, String)>,
}

#[derive(Default)]
pub struct MockStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    puts: AtomicUsize,
    /// 1-based index of the put that fails.
    fail_put_at: Mutex<Option<usize>>,
    /// Puts whose key contains this text fail.
    fail_key_containing: Mutex<Option<String>>,
    /// Applied to successful puts only.
    put_delay: Mutex<Option<Duration>>,
    fail_deletes: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_put_at(&self, nth: usize) {
        *self.fail_put_at.lock().unwrap() = Some(nth);
    }

    pub fn fail_key_containing(&self, needle: &str) {
        *self.fail_key_containing.lock().unwrap() = Some(needle.to_string());
    }

    pub fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// Fetch an object by the URL the pipeline returned.
    pub fn fetch(&self, url: &str) -> Option<StoredObject> {
        let key = self.key_from_url(url).ok()?;
        self.object(&key)
    }

    pub fn insert(&self, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: Bytes::copy_from_slice(data),
                content_type: "application/octet-stream".to_string(),
                metadata: Vec::new(),
            },
        );
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_by_key = self
            .fail_key_containing
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|needle| storage_key.contains(needle));
        if fail_by_key || *self.fail_put_at.lock().unwrap() == Some(n) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure on put {}",
                n
            )));
        }
        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.objects.lock().unwrap().insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.pairs(),
            },
        );
        Ok(self.public_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("injected delete failure".to_string()));
        }
        match self.objects.lock().unwrap().remove(storage_key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(storage_key.to_string())),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", MOCK_BASE_URL, storage_key)
    }

    fn key_from_url(&self, url: &str) -> StorageResult<String> {
        key_from_public_url(MOCK_BASE_URL, url)
    }

    fn bucket(&self) -> Option<&str> {
        Some("bucket")
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
