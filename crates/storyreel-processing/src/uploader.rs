use std::sync::Arc;

use bytes::Bytes;
use storyreel_core::{
    Artifact, ArtifactKind, PipelineError, PipelineResult, RemoteObjectRef, TranscodeOutput,
};
use storyreel_storage::keys::{single_object_key, streamed_object_key};
use storyreel_storage::{ObjectMetadata, Storage};

/// Pushes transcoder artifacts to the remote store.
///
/// Artifacts are uploaded one after another. The first failure stops the job; objects
/// stored before it are left in place.
#[derive(Clone)]
pub struct RemoteUploader {
    storage: Arc<dyn Storage>,
}

impl RemoteUploader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Key for every artifact of `output`, in upload order.
    pub fn keys_for(&self, output: &TranscodeOutput, prefix: &str, object_id: &str) -> Vec<String> {
        if output.is_streamed() {
            output
                .artifacts
                .iter()
                .map(|a| {
                    streamed_object_key(prefix, output.category, object_id, a.file_name().unwrap_or("file"))
                })
                .collect()
        } else {
            output
                .artifacts
                .iter()
                .map(|a| single_object_key(prefix, output.category, object_id, a.extension().as_deref()))
                .collect()
        }
    }

    /// Upload all artifacts. For streamed media element 0 is the playlist.
    ///
    /// `prefix` must already be normalized.
    pub async fn upload(
        &self,
        output: &TranscodeOutput,
        prefix: &str,
        object_id: &str,
        original_name: &str,
    ) -> PipelineResult<Vec<RemoteObjectRef>> {
        let metadata = ObjectMetadata::new(original_name);
        let keys = self.keys_for(output, prefix, object_id);
        let start = std::time::Instant::now();

        let mut refs = Vec::with_capacity(keys.len());
        for (artifact, key) in output.artifacts.iter().zip(keys) {
            refs.push(self.upload_one(artifact, &key, original_name, &metadata).await?);
        }

        tracing::info!(
            file_name = %original_name,
            category = %output.category,
            objects = refs.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Artifacts uploaded"
        );

        Ok(refs)
    }

    pub async fn upload_one(
        &self,
        artifact: &Artifact,
        key: &str,
        original_name: &str,
        metadata: &ObjectMetadata,
    ) -> PipelineResult<RemoteObjectRef> {
        let artifact_name = artifact.file_name().unwrap_or("artifact").to_string();
        let upload_error = |source: anyhow::Error| PipelineError::Upload {
            file_name: original_name.to_string(),
            artifact: artifact_name.clone(),
            source,
        };

        let data = tokio::fs::read(&artifact.local_path)
            .await
            .map_err(|e| upload_error(e.into()))?;

        let url = self
            .storage
            .upload_with_key(key, Bytes::from(data), &artifact.content_type, metadata)
            .await
            .map_err(|e| {
                tracing::error!(
                    file_name = %original_name,
                    artifact = %artifact_name,
                    key = %key,
                    error = %e,
                    "Artifact upload failed"
                );
                upload_error(e.into())
            })?;

        if artifact.kind == ArtifactKind::Playlist {
            tracing::debug!(key = %key, "Playlist uploaded");
        }

        Ok(RemoteObjectRef {
            key: key.to_string(),
            url,
            content_type: artifact.content_type.clone(),
        })
    }
}
