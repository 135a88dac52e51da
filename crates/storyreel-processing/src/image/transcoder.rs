use async_trait::async_trait;
use storyreel_core::{
    Artifact, MediaCategory, PipelineError, PipelineResult, StagedFile, TranscodeOutput,
};

use super::compressor::compress_to_jpeg;
use super::JPEG_CONTENT_TYPE;
use crate::staging::JobContext;
use crate::transcoder::Transcoder;

/// Re-encodes images as JPEG capped at `max_width`.
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    max_width: u32,
    quality: u8,
}

impl ImageTranscoder {
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self { max_width, quality }
    }
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self::new(1080, 80)
    }
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    fn category(&self) -> MediaCategory {
        MediaCategory::Image
    }

    async fn transcode(
        &self,
        job: &mut JobContext,
        staged: &StagedFile,
    ) -> PipelineResult<TranscodeOutput> {
        let file_name = staged.original_file_name.clone();
        let image_error = |message: String| PipelineError::ImageProcessing {
            file_name: file_name.clone(),
            message,
        };

        let data = tokio::fs::read(&staged.local_path)
            .await
            .map_err(|e| image_error(format!("could not read staged image: {}", e.kind())))?;

        let (max_width, quality) = (self.max_width, self.quality);
        let start = std::time::Instant::now();
        let compressed =
            tokio::task::spawn_blocking(move || compress_to_jpeg(&data, max_width, quality))
                .await
                .map_err(|e| image_error(format!("image task failed: {}", e)))?
                .map_err(|e| image_error(e.to_string()))?;

        let output_path = job.allocate("compressed.jpg");
        tokio::fs::write(&output_path, &compressed.data)
            .await
            .map_err(|e| image_error(format!("could not write compressed image: {}", e.kind())))?;

        tracing::info!(
            file_name = %file_name,
            original_width = compressed.original_width,
            original_height = compressed.original_height,
            width = compressed.width,
            height = compressed.height,
            size_bytes = compressed.data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image compressed to JPEG"
        );

        job.discard(&staged.local_path).await;

        Ok(TranscodeOutput::single(
            MediaCategory::Image,
            Artifact::file(output_path, JPEG_CONTENT_TYPE),
        ))
    }
}
