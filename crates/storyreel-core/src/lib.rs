//! Storyreel Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration shared by
//! the story media pipeline crates.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, PolicyLimits};
pub use error::{ErrorMetadata, JobStage, LogLevel, PipelineError, PipelineResult};
pub use models::{
    Artifact, ArtifactKind, DeleteOutcome, DeleteReport, FileSource, MediaCategory,
    RemoteFileInfo, RemoteObjectRef, StagedFile, TranscodeOutput, UploadRequest,
};
pub use storage_types::StorageBackend;
