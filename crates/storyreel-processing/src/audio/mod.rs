//! Audio transcoding
//!
//! Same two-stage shape as video: fixed-bitrate compression, then HLS segmentation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use storyreel_core::{MediaCategory, PipelineResult, StagedFile, TranscodeOutput};

use crate::segmenter::Segmenter;
use crate::staging::JobContext;
use crate::tool::{CommandRunner, ToolCommand};
use crate::transcoder::Transcoder;
use crate::video::compress_and_segment;

#[derive(Clone)]
pub struct AudioTranscoder {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_path: String,
    bitrate_kbps: u32,
    segmenter: Segmenter,
}

impl AudioTranscoder {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ffmpeg_path: impl Into<String>,
        bitrate_kbps: u32,
        segmenter: Segmenter,
    ) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            bitrate_kbps,
            segmenter,
        }
    }

    pub fn compress_command(&self, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .path_arg(input)
            .arg("-vn")
            .arg("-b:a")
            .arg(format!("{}k", self.bitrate_kbps))
            .path_arg(output)
    }
}

#[async_trait]
impl Transcoder for AudioTranscoder {
    fn category(&self) -> MediaCategory {
        MediaCategory::Audio
    }

    #[tracing::instrument(skip(self, job, staged), fields(file_name = %staged.original_file_name))]
    async fn transcode(
        &self,
        job: &mut JobContext,
        staged: &StagedFile,
    ) -> PipelineResult<TranscodeOutput> {
        compress_and_segment(
            self.runner.as_ref(),
            &self.segmenter,
            job,
            staged,
            MediaCategory::Audio,
            "compressed.mp3",
            |input, output| self.compress_command(input, output),
        )
        .await
    }
}
