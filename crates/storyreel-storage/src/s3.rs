use crate::keys::{key_from_public_url, validate_key};
use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    storage_host: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `storage_host` - Optional public host used in returned URLs as
    ///   `https://{bucket}.{storage_host}/{key}`
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        storage_host: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            storage_host: storage_host
                .map(|h| h.trim().trim_matches('/').to_string())
                .filter(|h| !h.is_empty()),
        })
    }

    /// Base URL under which every key of this bucket is served
    ///
    /// An explicit storage host wins. Otherwise S3-compatible endpoints use path-style
    /// `{endpoint}/{bucket}` and AWS uses `https://{bucket}.s3.{region}.amazonaws.com`.
    fn base_url(&self) -> String {
        if let Some(ref host) = self.storage_host {
            format!("https://{}.{}", self.bucket, host)
        } else if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket)
        } else {
            format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region)
        }
    }

    fn put_options(content_type: &str, metadata: &ObjectMetadata) -> PutOptions {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        for (name, value) in metadata.pairs() {
            attributes.insert(Attribute::Metadata(name.into()), value.into());
        }
        PutOptions {
            attributes,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(
                &location,
                PutPayload::from(data),
                Self::put_options(content_type, metadata),
            )
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload_with_key failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.public_url(storage_key);

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload_with_key successful"
        );

        Ok(url)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let start = std::time::Instant::now();

        // S3 deletes of missing keys succeed silently, so check first.
        if !self.exists(storage_key).await? {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let location = Path::from(storage_key.to_string());
        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", self.base_url(), storage_key)
    }

    fn key_from_url(&self, url: &str) -> StorageResult<String> {
        key_from_public_url(&self.base_url(), url)
    }

    fn bucket(&self) -> Option<&str> {
        Some(&self.bucket)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(endpoint: Option<&str>, host: Option<&str>) -> S3Storage {
        S3Storage::new(
            "stories".to_string(),
            "eu-west-1".to_string(),
            endpoint.map(String::from),
            host.map(String::from),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn aws_urls_are_virtual_hosted() {
        let s3 = storage(None, None).await;
        assert_eq!(
            s3.public_url("story/image/abc.jpg"),
            "https://stories.s3.eu-west-1.amazonaws.com/story/image/abc.jpg"
        );
        assert_eq!(s3.bucket(), Some("stories"));
        assert_eq!(s3.backend_type(), StorageBackend::S3);
    }

    #[tokio::test]
    async fn storage_host_overrides_url_base() {
        let s3 = storage(Some("http://localhost:9000"), Some("cdn.example.com/")).await;
        let url = s3.public_url("story/video/abc/index.m3u8");
        assert_eq!(url, "https://stories.cdn.example.com/story/video/abc/index.m3u8");
        assert_eq!(s3.key_from_url(&url).unwrap(), "story/video/abc/index.m3u8");
    }

    #[tokio::test]
    async fn custom_endpoint_uses_path_style() {
        let s3 = storage(Some("http://localhost:9000/"), None).await;
        let url = s3.public_url("story/audio/x/segment_000.ts");
        assert_eq!(url, "http://localhost:9000/stories/story/audio/x/segment_000.ts");
        assert_eq!(s3.key_from_url(&url).unwrap(), "story/audio/x/segment_000.ts");
    }

    #[tokio::test]
    async fn urls_from_other_buckets_are_rejected() {
        let s3 = storage(None, None).await;
        let err = s3
            .key_from_url("https://other.s3.eu-west-1.amazonaws.com/story/image/abc.jpg")
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn put_options_carry_content_type_and_metadata() {
        let metadata = ObjectMetadata::new("clip.mp4");
        let options = S3Storage::put_options("video/mp2t", &metadata);
        assert_eq!(
            options.attributes.get(&Attribute::ContentType).map(|v| AsRef::<str>::as_ref(v)),
            Some("video/mp2t")
        );
        assert_eq!(
            options
                .attributes
                .get(&Attribute::Metadata("original-name".into()))
                .map(|v| AsRef::<str>::as_ref(v)),
            Some("clip.mp4")
        );
    }
}
