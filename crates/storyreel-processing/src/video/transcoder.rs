use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use storyreel_core::{
    JobStage, MediaCategory, PipelineError, PipelineResult, StagedFile, TranscodeOutput,
};

use super::state::StageTracker;
use crate::segmenter::Segmenter;
use crate::staging::JobContext;
use crate::tool::{run_external_tool, CommandRunner, ToolCommand};
use crate::transcoder::Transcoder;

/// Compress `staged` with `command`, then segment the result.
///
/// Each intermediate is discarded as soon as the next stage has consumed it.
pub(crate) async fn compress_and_segment(
    runner: &dyn CommandRunner,
    segmenter: &Segmenter,
    job: &mut JobContext,
    staged: &StagedFile,
    category: MediaCategory,
    compressed_suffix: &str,
    command: impl FnOnce(&Path, &Path) -> ToolCommand,
) -> PipelineResult<TranscodeOutput> {
    let file_name = staged.original_file_name.as_str();
    let mut tracker = StageTracker::new(file_name);
    let start = std::time::Instant::now();

    tracker.advance(); // Compressing
    let compressed = job.allocate(compressed_suffix);
    let command = command(&staged.local_path, &compressed);
    if let Err(e) = run_external_tool(runner, &command, &compressed).await {
        let err = PipelineError::TranscodeProcess {
            file_name: file_name.to_string(),
            stage: JobStage::Compressing,
            source: e.into(),
        };
        tracker.fail(&err);
        return Err(err);
    }

    tracker.advance(); // Compressed
    tracing::info!(
        file_name = %file_name,
        category = %category,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Media compressed"
    );
    job.discard(&staged.local_path).await;

    tracker.advance(); // Segmenting
    let output = match segmenter.segment(job, file_name, &compressed, category).await {
        Ok(output) => output,
        Err(err) => {
            tracker.fail(&err);
            return Err(err);
        }
    };

    tracker.advance(); // SegmentedReady
    job.discard(&compressed).await;

    tracing::info!(
        file_name = %file_name,
        category = %category,
        segment_count = output.segment_count(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Media ready for streaming"
    );

    Ok(output)
}

/// Compresses video with a constant rate factor, then segments it into HLS.
#[derive(Clone)]
pub struct VideoTranscoder {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_path: String,
    crf: u8,
    segmenter: Segmenter,
}

impl VideoTranscoder {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ffmpeg_path: impl Into<String>,
        crf: u8,
        segmenter: Segmenter,
    ) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            crf,
            segmenter,
        }
    }

    pub fn compress_command(&self, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .path_arg(input)
            .arg("-vcodec")
            .arg("libx264")
            .arg("-crf")
            .arg(self.crf.to_string())
            .arg("-preset")
            .arg("veryfast")
            .arg("-acodec")
            .arg("aac")
            .path_arg(output)
    }
}

#[async_trait]
impl Transcoder for VideoTranscoder {
    fn category(&self) -> MediaCategory {
        MediaCategory::Video
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
            MediaCategory::Video,
            "compressed.mp4",
            |input, output| self.compress_command(input, output),
        )
        .await
    }
}
