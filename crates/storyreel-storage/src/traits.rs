//! Storage abstraction trait
//!
//! This module defines the Storage trait that all remote object stores must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// User metadata attached to every stored object.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ObjectMetadata {
    pub fn new(original_name: impl Into<String>) -> Self {
        Self {
            original_name: original_name.into(),
            uploaded_at: Utc::now(),
        }
    }

    /// Metadata as `(name, value)` pairs, in the order they are sent to the store.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("original-name", self.original_name.clone()),
            ("uploaded-at", self.uploaded_at.to_rfc3339()),
        ]
    }
}

/// Storage abstraction trait
///
/// The pipeline only ever writes to explicit keys built by [`crate::keys`], and deletes
/// objects identified by the URLs it previously returned.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload data to a specific storage key. Returns the public URL for the object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<String>;

    /// Delete an object by its storage key.
    ///
    /// A missing object yields [`StorageError::NotFound`].
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Deterministic public URL of a key. No network call.
    fn public_url(&self, storage_key: &str) -> String;

    /// Reverse of [`Storage::public_url`]: extract the key from a URL served by this store.
    ///
    /// URLs that do not belong to this store yield [`StorageError::InvalidKey`].
    fn key_from_url(&self, url: &str) -> StorageResult<String>;

    /// Bucket name, for backends that have one.
    fn bucket(&self) -> Option<&str> {
        None
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
