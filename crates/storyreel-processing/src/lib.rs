//! Storyreel Processing Library
//!
//! The story media pipeline: classify and validate uploads, stage them in a scratch
//! directory, compress images to JPEG and video/audio to HLS, push the artifacts to
//! the remote store and remove every local file the job created.

pub mod audio;
pub mod cleanup;
pub mod hls;
pub mod image;
pub mod passthrough;
pub mod pipeline;
pub mod segmenter;
pub mod staging;
pub mod sweeper;
pub mod tool;
pub mod transcoder;
pub mod uploader;
pub mod validator;
pub mod video;

// Re-export commonly used types
pub use audio::AudioTranscoder;
pub use cleanup::{cleanup_tracked, CleanupReport};
pub use crate::image::ImageTranscoder;
pub use passthrough::PassthroughTranscoder;
pub use pipeline::MediaPipeline;
pub use segmenter::Segmenter;
pub use staging::{JobContext, StagingStore};
pub use sweeper::{ScratchSweeper, SweepReport};
pub use tool::{run_external_tool, CommandRunner, ProcessRunner, ToolCommand, ToolError, ToolOutput};
pub use transcoder::{Transcoder, TranscoderSet};
pub use uploader::RemoteUploader;
pub use validator::{MediaValidator, ValidatedMedia};
pub use video::{VideoState, VideoTranscoder};
