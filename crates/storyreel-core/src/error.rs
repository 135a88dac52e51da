//! Error types module
//!
//! All pipeline failures are unified under [`PipelineError`]. Every variant names the
//! original file (or URL) and the stage it failed in. Display strings never include
//! local scratch paths or encoder command lines; those live in the `source` chain and
//! are only logged.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use crate::models::MediaCategory;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and bad input files
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code the request layer should return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SIZE_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Stage of an upload or delete job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Validation,
    Staging,
    ImageEncoding,
    Compressing,
    Segmenting,
    Uploading,
    Deleting,
}

impl Display for JobStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            JobStage::Validation => "validation",
            JobStage::Staging => "staging",
            JobStage::ImageEncoding => "image encoding",
            JobStage::Compressing => "compression",
            JobStage::Segmenting => "segmentation",
            JobStage::Uploading => "upload",
            JobStage::Deleting => "deletion",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Unsupported file type for {file_name}: {reason}")]
    UnsupportedType { file_name: String, reason: String },

    #[error(
        "File size exceeds {}MB limit for {category}: {file_name}",
        .max_bytes / (1024 * 1024)
    )]
    SizeExceeded {
        file_name: String,
        category: MediaCategory,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("Invalid upload batch: {0}")]
    InvalidBatch(String),

    #[error("Invalid destination prefix {prefix}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("Failed to stage {file_name}")]
    Staging {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("Image processing failed for {file_name}: {message}")]
    ImageProcessing { file_name: String, message: String },

    #[error("Transcoding failed for {file_name} during {stage}")]
    TranscodeProcess {
        file_name: String,
        stage: JobStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("HLS segmentation failed for {file_name}: {reason}")]
    Segmentation {
        file_name: String,
        reason: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Upload failed for {file_name} (artifact {artifact})")]
    Upload {
        file_name: String,
        artifact: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("File not found for deletion: {url}")]
    NotFoundOnDelete { url: String },

    #[error("Invalid storage URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to delete {url}")]
    Delete {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Stage in which the error occurred.
    pub fn stage(&self) -> JobStage {
        match self {
            PipelineError::UnsupportedType { .. }
            | PipelineError::SizeExceeded { .. }
            | PipelineError::InvalidBatch(_)
            | PipelineError::InvalidPrefix { .. } => JobStage::Validation,
            PipelineError::Staging { .. } => JobStage::Staging,
            PipelineError::ImageProcessing { .. } => JobStage::ImageEncoding,
            PipelineError::TranscodeProcess { stage, .. } => *stage,
            PipelineError::Segmentation { .. } => JobStage::Segmenting,
            PipelineError::Upload { .. } => JobStage::Uploading,
            PipelineError::NotFoundOnDelete { .. }
            | PipelineError::InvalidUrl { .. }
            | PipelineError::Delete { .. } => JobStage::Deleting,
        }
    }

    /// Original file name the error refers to, for upload errors.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            PipelineError::UnsupportedType { file_name, .. }
            | PipelineError::SizeExceeded { file_name, .. }
            | PipelineError::Staging { file_name, .. }
            | PipelineError::ImageProcessing { file_name, .. }
            | PipelineError::TranscodeProcess { file_name, .. }
            | PipelineError::Segmentation { file_name, .. }
            | PipelineError::Upload { file_name, .. } => Some(file_name),
            _ => None,
        }
    }

    /// Whether the error happened before any local or remote side effect.
    pub fn is_preflight(&self) -> bool {
        self.stage() == JobStage::Validation
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
fn pipeline_error_static_metadata(
    err: &PipelineError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        PipelineError::UnsupportedType { .. } => (
            415,
            "UNSUPPORTED_TYPE",
            false,
            Some("Upload an image, video, audio or document in a supported format"),
            LogLevel::Debug,
        ),
        PipelineError::SizeExceeded { .. } => (
            413,
            "SIZE_EXCEEDED",
            false,
            Some("Reduce file size and try again"),
            LogLevel::Debug,
        ),
        PipelineError::InvalidBatch(_) => (
            400,
            "INVALID_BATCH",
            false,
            Some("Send several images, or exactly one audio or video file"),
            LogLevel::Debug,
        ),
        PipelineError::InvalidPrefix { .. } => (
            400,
            "INVALID_PREFIX",
            false,
            Some("Use a slash-separated prefix without empty or '..' segments"),
            LogLevel::Debug,
        ),
        PipelineError::Staging { .. } => (
            500,
            "STAGING_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        PipelineError::ImageProcessing { .. } => (
            422,
            "IMAGE_PROCESSING_ERROR",
            false,
            Some("Check image format and try a different file"),
            LogLevel::Warn,
        ),
        PipelineError::TranscodeProcess { .. } => (
            422,
            "TRANSCODE_PROCESS_ERROR",
            false,
            Some("Check that the media file plays correctly and try again"),
            LogLevel::Warn,
        ),
        PipelineError::Segmentation { .. } => (
            500,
            "SEGMENTATION_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
        PipelineError::Upload { .. } => (
            502,
            "UPLOAD_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        PipelineError::NotFoundOnDelete { .. } => (
            404,
            "NOT_FOUND_ON_DELETE",
            false,
            Some("Verify the file URL exists"),
            LogLevel::Debug,
        ),
        PipelineError::InvalidUrl { .. } => (
            400,
            "INVALID_URL",
            false,
            Some("Use a URL returned by an upload"),
            LogLevel::Debug,
        ),
        PipelineError::Delete { .. } => (
            502,
            "DELETE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for PipelineError {
    fn http_status_code(&self) -> u16 {
        pipeline_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        pipeline_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        pipeline_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        // Display never carries the source chain, so it is safe to show.
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).4
    }
}
