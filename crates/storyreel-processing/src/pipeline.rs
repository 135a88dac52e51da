//! Upload and delete orchestration.
//!
//! A job runs validate, stage, transcode, upload and release strictly in that order.
//! Validation failures return before anything touches the scratch directory. Every
//! later failure releases the job context before it is returned.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use storyreel_core::{
    Config, DeleteOutcome, DeleteReport, ErrorMetadata, LogLevel, PipelineError, PipelineResult,
    RemoteFileInfo, RemoteObjectRef, UploadRequest,
};
use storyreel_storage::keys::{normalize_prefix, sanitize_object_id, split_key_file_name};
use storyreel_storage::{Storage, StorageError};
use uuid::Uuid;

use crate::staging::{JobContext, StagingStore};
use crate::tool::CommandRunner;
use crate::transcoder::TranscoderSet;
use crate::uploader::RemoteUploader;
use crate::validator::{MediaValidator, ValidatedMedia};

struct PipelineInner {
    validator: MediaValidator,
    staging: StagingStore,
    transcoders: TranscoderSet,
    uploader: RemoteUploader,
    storage: Arc<dyn Storage>,
    max_concurrent_jobs: usize,
}

/// Entry point for story media uploads and deletes. Cheap to clone.
#[derive(Clone)]
pub struct MediaPipeline {
    inner: Arc<PipelineInner>,
}

impl MediaPipeline {
    pub fn new(
        validator: MediaValidator,
        staging: StagingStore,
        transcoders: TranscoderSet,
        storage: Arc<dyn Storage>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                validator,
                staging,
                transcoders,
                uploader: RemoteUploader::new(storage.clone()),
                storage,
                max_concurrent_jobs: max_concurrent_jobs.max(1),
            }),
        }
    }

    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self::new(
            MediaValidator::new(config.limits),
            StagingStore::new(&config.scratch_dir),
            TranscoderSet::from_config(config, runner),
            storage,
            config.max_concurrent_jobs,
        )
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn staging(&self) -> &StagingStore {
        &self.inner.staging
    }

    /// Upload one file and return its public URL. For audio and video this is the
    /// playlist URL.
    pub async fn upload_single(&self, request: UploadRequest, prefix: &str) -> PipelineResult<String> {
        let refs = self.upload_single_detailed(request, prefix).await?;
        primary_url(refs)
    }

    /// Upload one file and return every stored object. For streamed media element 0 is
    /// the playlist, followed by the segments in playback order.
    pub async fn upload_single_detailed(
        &self,
        request: UploadRequest,
        prefix: &str,
    ) -> PipelineResult<Vec<RemoteObjectRef>> {
        let validated = self.preflight(&request)?;
        let prefix = checked_prefix(prefix)?;
        self.run_job(&request, &validated, &prefix).await
    }

    /// Upload a batch and return one URL per file, in input order.
    ///
    /// Every file is validated before any of them is staged. A batch holding an audio or
    /// video file must hold nothing else. At most `max_concurrent_jobs` jobs run at once.
    /// After the first failure no further job is started, jobs already running finish
    /// and release their scratch files, and the failure of the earliest file is returned.
    /// Files stored before it stay stored and their URLs are not returned.
    pub async fn upload_multiple(
        &self,
        requests: Vec<UploadRequest>,
        prefix: &str,
    ) -> PipelineResult<Vec<String>> {
        if requests.is_empty() {
            return Err(PipelineError::InvalidBatch("no files provided".to_string()));
        }

        let validated = requests
            .iter()
            .map(|r| self.preflight(r))
            .collect::<PipelineResult<Vec<_>>>()?;

        let streamed = validated.iter().filter(|v| v.category.is_streamed()).count();
        if streamed > 0 && validated.len() > 1 {
            let err = PipelineError::InvalidBatch(
                "audio and video must be uploaded one file per request".to_string(),
            );
            tracing::debug!(files = validated.len(), streamed = streamed, "Rejected upload batch");
            return Err(err);
        }

        let prefix = checked_prefix(prefix)?;
        let start = std::time::Instant::now();

        let mut pending = requests.iter().zip(validated.iter()).enumerate();
        let mut in_flight = FuturesUnordered::new();
        let mut urls: Vec<Option<String>> = vec![None; requests.len()];
        let mut failure: Option<(usize, PipelineError)> = None;

        loop {
            while failure.is_none() && in_flight.len() < self.inner.max_concurrent_jobs {
                let Some((index, (request, validated))) = pending.next() else {
                    break;
                };
                let prefix = prefix.as_str();
                in_flight.push(async move {
                    let result = self
                        .run_job(request, validated, prefix)
                        .await
                        .and_then(primary_url);
                    (index, result)
                });
            }

            let Some((index, result)) = in_flight.next().await else {
                break;
            };
            match result {
                Ok(url) => urls[index] = Some(url),
                Err(e) if failure.as_ref().map_or(true, |(first, _)| index < *first) => {
                    failure = Some((index, e));
                }
                Err(_) => {}
            }
        }

        if let Some((index, err)) = failure {
            tracing::warn!(
                files = requests.len(),
                completed = urls.iter().filter(|u| u.is_some()).count(),
                failed_index = index,
                "Upload batch aborted"
            );
            return Err(err);
        }

        let urls: Vec<String> = urls.into_iter().flatten().collect();
        tracing::info!(
            files = urls.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload batch completed"
        );

        Ok(urls)
    }

    /// Delete one stored object. A missing object is an error here.
    pub async fn delete_single(&self, url: &str) -> PipelineResult<()> {
        let key = self.key_for(url)?;
        match self.inner.storage.delete(&key).await {
            Ok(()) => {
                tracing::info!(key = %key, "Object deleted");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Err(PipelineError::NotFoundOnDelete {
                url: url.to_string(),
            }),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Object delete failed");
                Err(PipelineError::Delete {
                    url: url.to_string(),
                    source: e.into(),
                })
            }
        }
    }

    /// Delete every URL concurrently and report each outcome in input order.
    ///
    /// Missing objects are reported, not raised.
    pub async fn delete_multiple(&self, urls: &[String]) -> DeleteReport {
        let outcomes = futures::future::join_all(urls.iter().map(|url| self.delete_outcome(url))).await;
        let report = DeleteReport { outcomes };

        tracing::info!(
            requested = urls.len(),
            deleted = report.deleted(),
            not_found = report.not_found(),
            failed = report.failed(),
            "Batch delete completed"
        );

        report
    }

    /// Describe a stored object from its URL alone.
    pub fn file_info(&self, url: &str) -> PipelineResult<RemoteFileInfo> {
        let key = self.key_for(url)?;
        let (file_name, extension) = split_key_file_name(&key);
        Ok(RemoteFileInfo {
            key,
            file_name,
            extension,
            bucket: self.inner.storage.bucket().map(str::to_string),
        })
    }

    async fn delete_outcome(&self, url: &str) -> DeleteOutcome {
        match self.delete_single(url).await {
            Ok(()) => DeleteOutcome::Deleted {
                url: url.to_string(),
            },
            Err(PipelineError::NotFoundOnDelete { url }) => {
                tracing::debug!(url = %url, "Object already absent");
                DeleteOutcome::NotFound { url }
            }
            Err(e) => DeleteOutcome::Failed {
                url: url.to_string(),
                reason: e.client_message(),
            },
        }
    }

    fn key_for(&self, url: &str) -> PipelineResult<String> {
        self.inner
            .storage
            .key_from_url(url)
            .map_err(|e| PipelineError::InvalidUrl {
                url: url.to_string(),
                reason: match e {
                    StorageError::InvalidKey(reason) => reason,
                    other => other.to_string(),
                },
            })
    }

    fn preflight(&self, request: &UploadRequest) -> PipelineResult<ValidatedMedia> {
        self.inner.validator.validate(request).inspect_err(log_failure)
    }

    /// Stage, transcode and upload one validated file. The job context is released on
    /// every path out of here.
    async fn run_job(
        &self,
        request: &UploadRequest,
        validated: &ValidatedMedia,
        prefix: &str,
    ) -> PipelineResult<Vec<RemoteObjectRef>> {
        let mut job = self.inner.staging.begin_job();
        let start = std::time::Instant::now();
        let result = self.process(&mut job, request, validated, prefix).await;

        let cleanup = job.release().await;
        if !cleanup.is_clean() {
            tracing::warn!(
                file_name = %request.original_file_name(),
                failures = cleanup.failures.len(),
                "Scratch cleanup incomplete, leaving leftovers to the sweeper"
            );
        }

        match &result {
            Ok(refs) => tracing::info!(
                file_name = %request.original_file_name(),
                category = %validated.category,
                objects = refs.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Upload job completed"
            ),
            Err(e) => log_failure(e),
        }

        result
    }

    async fn process(
        &self,
        job: &mut JobContext,
        request: &UploadRequest,
        validated: &ValidatedMedia,
        prefix: &str,
    ) -> PipelineResult<Vec<RemoteObjectRef>> {
        let staged = job.stage(request).await?;
        let output = self
            .inner
            .transcoders
            .for_category(validated.category)
            .transcode(job, &staged)
            .await?;

        let object_id = request
            .custom_file_name()
            .and_then(sanitize_object_id)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        self.inner
            .uploader
            .upload(&output, prefix, &object_id, request.original_file_name())
            .await
    }
}

fn checked_prefix(prefix: &str) -> PipelineResult<String> {
    normalize_prefix(prefix).map_err(|e| PipelineError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: match e {
            StorageError::InvalidKey(reason) => reason,
            other => other.to_string(),
        },
    })
}

fn primary_url(refs: Vec<RemoteObjectRef>) -> PipelineResult<String> {
    refs.into_iter()
        .next()
        .map(|r| r.url)
        .ok_or_else(|| PipelineError::InvalidBatch("job produced no stored objects".to_string()))
}

fn log_failure(err: &PipelineError) {
    let file_name = err.file_name().unwrap_or("-");
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(
            file_name = %file_name,
            stage = %err.stage(),
            error_code = err.error_code(),
            "Upload rejected: {}", err
        ),
        LogLevel::Warn => tracing::warn!(
            file_name = %file_name,
            stage = %err.stage(),
            error_code = err.error_code(),
            error = ?err,
            "Upload job failed: {}", err
        ),
        LogLevel::Error => tracing::error!(
            file_name = %file_name,
            stage = %err.stage(),
            error_code = err.error_code(),
            error = ?err,
            "Upload job failed: {}", err
        ),
    }
}
