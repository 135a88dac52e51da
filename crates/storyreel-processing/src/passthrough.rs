use async_trait::async_trait;
use storyreel_core::{Artifact, MediaCategory, PipelineResult, StagedFile, TranscodeOutput};

use crate::staging::JobContext;
use crate::transcoder::Transcoder;

/// Stores documents as uploaded, under their declared MIME type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    fn category(&self) -> MediaCategory {
        MediaCategory::DocumentFallback
    }

    async fn transcode(
        &self,
        _job: &mut JobContext,
        staged: &StagedFile,
    ) -> PipelineResult<TranscodeOutput> {
        Ok(TranscodeOutput::single(
            MediaCategory::DocumentFallback,
            Artifact::file(staged.local_path.clone(), staged.declared_mime_type.clone())
                .with_remote_extension(staged.original_extension()),
        ))
    }
}
