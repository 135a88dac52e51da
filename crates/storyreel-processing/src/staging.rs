//! Scratch staging and per-job path tracking.
//!
//! Each job gets a [`JobContext`] holding a unique token and the ordered list of every
//! local path the job created. The context removes those paths when it is released,
//! or when it is dropped without being released.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use storyreel_core::{FileSource, PipelineError, PipelineResult, StagedFile, UploadRequest};
use storyreel_storage::keys::{fit_file_name, sanitize_file_name};
use uuid::Uuid;

use crate::cleanup::{cleanup_tracked, CleanupReport};

/// Longest single path component most filesystems accept.
const MAX_LOCAL_NAME_LEN: usize = 255;

/// Shared scratch directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start tracking a new job. Nothing is written until a path is staged or allocated.
    pub fn begin_job(&self) -> JobContext {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        JobContext {
            root: self.root.clone(),
            token: format!("{}_{}", millis, Uuid::new_v4().simple()),
            tracked: Vec::new(),
            released: false,
        }
    }
}

/// Paths owned by one upload job.
#[derive(Debug)]
pub struct JobContext {
    root: PathBuf,
    token: String,
    tracked: Vec<PathBuf>,
    released: bool,
}

impl JobContext {
    /// Unique prefix of every local name this job creates.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn scratch_root(&self) -> &Path {
        &self.root
    }

    /// Paths created so far, in creation order, without duplicates.
    pub fn tracked_paths(&self) -> &[PathBuf] {
        &self.tracked
    }

    /// Track a path created on behalf of this job (e.g. encoder output).
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.tracked.contains(&path) {
            self.tracked.push(path);
        }
    }

    async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Reserve `{root}/{token}.{suffix}` for a file the job is about to write.
    ///
    /// Staged uploads use `{token}_{name}`, so derived files never collide with them.
    pub fn allocate(&mut self, suffix: &str) -> PathBuf {
        self.claim(format!("{}.{}", self.token, suffix))
    }

    fn claim(&mut self, local_name: String) -> PathBuf {
        let path = self.root.join(local_name);
        self.register(path.clone());
        path
    }

    /// Create and track a per-job directory such as the HLS chunk directory.
    pub async fn allocate_dir(&mut self, suffix: &str) -> io::Result<PathBuf> {
        self.ensure_root().await?;
        let dir = self.allocate(suffix);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Write the upload into scratch under a collision-free name.
    ///
    /// A caller-owned source path is copied, never moved.
    pub async fn stage(&mut self, request: &UploadRequest) -> PipelineResult<StagedFile> {
        let file_name = request.original_file_name();
        let staging_error = |source: io::Error| PipelineError::Staging {
            file_name: file_name.to_string(),
            source,
        };

        self.ensure_root().await.map_err(staging_error)?;
        // Tracked before writing so a partial write is still cleaned up.
        let budget = MAX_LOCAL_NAME_LEN - self.token.len() - 1;
        let local_name = fit_file_name(&sanitize_file_name(file_name), budget);
        let local_path = self.claim(format!("{}_{}", self.token, local_name));

        let size_bytes = match request.source() {
            FileSource::Bytes(data) => {
                tokio::fs::write(&local_path, data)
                    .await
                    .map_err(staging_error)?;
                data.len() as u64
            }
            FileSource::Path(source) => tokio::fs::copy(source, &local_path)
                .await
                .map_err(staging_error)?,
        };

        tracing::debug!(
            file_name = %file_name,
            size_bytes = size_bytes,
            job = %self.token,
            "File staged"
        );

        Ok(StagedFile {
            local_path,
            size_bytes,
            original_file_name: file_name.to_string(),
            declared_mime_type: request.declared_mime_type().to_string(),
        })
    }

    /// Remove an intermediate as soon as the next stage has consumed it.
    ///
    /// On success the path is untracked so it is deleted exactly once. On failure it stays
    /// tracked for the final cleanup. Returns whether the path is gone.
    pub async fn discard(&mut self, path: &Path) -> bool {
        let result = if tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        match result {
            Ok(()) => {
                self.untrack(path);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.untrack(path);
                true
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    job = %self.token,
                    "Failed to discard intermediate file, leaving it for job cleanup"
                );
                false
            }
        }
    }

    fn untrack(&mut self, path: &Path) {
        self.tracked.retain(|p| !p.starts_with(path));
    }

    /// Remove every tracked path. Consumes the context; nothing runs again on drop.
    ///
    /// If this future is dropped before it completes, `Drop` still cleans up inline.
    pub async fn release(mut self) -> CleanupReport {
        let root = self.root.clone();
        let tracked = self.tracked.clone();

        let report = match tokio::task::spawn_blocking(move || cleanup_tracked(&root, &tracked)).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Cleanup task failed, cleaning up inline");
                cleanup_tracked(&self.root, &self.tracked)
            }
        };

        self.released = true;
        self.tracked.clear();
        report
    }
}

impl Drop for JobContext {
    fn drop(&mut self) {
        if self.released || self.tracked.is_empty() {
            return;
        }
        tracing::debug!(
            job = %self.token,
            paths = self.tracked.len(),
            "Job context dropped without release, cleaning up scratch files"
        );
        let tracked = std::mem::take(&mut self.tracked);
        cleanup_tracked(&self.root, &tracked);
    }
}
