use std::sync::Arc;

use async_trait::async_trait;
use storyreel_core::{Config, MediaCategory, PipelineResult, StagedFile, TranscodeOutput};

use crate::audio::AudioTranscoder;
use crate::image::ImageTranscoder;
use crate::passthrough::PassthroughTranscoder;
use crate::segmenter::Segmenter;
use crate::staging::JobContext;
use crate::tool::CommandRunner;
use crate::video::VideoTranscoder;

/// Turns a staged upload into upload-ready artifacts for one media category.
///
/// Every path an implementation creates must be registered with `job`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    fn category(&self) -> MediaCategory;

    async fn transcode(
        &self,
        job: &mut JobContext,
        staged: &StagedFile,
    ) -> PipelineResult<TranscodeOutput>;
}

/// One transcoder per media category.
#[derive(Clone)]
pub struct TranscoderSet {
    image: Arc<dyn Transcoder>,
    video: Arc<dyn Transcoder>,
    audio: Arc<dyn Transcoder>,
    document: Arc<dyn Transcoder>,
}

impl TranscoderSet {
    pub fn new(
        image: Arc<dyn Transcoder>,
        video: Arc<dyn Transcoder>,
        audio: Arc<dyn Transcoder>,
        document: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            image,
            video,
            audio,
            document,
        }
    }

    /// Standard transcoders configured from `config`, running encoders through `runner`.
    pub fn from_config(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        let segmenter = Segmenter::new(
            runner.clone(),
            config.ffmpeg_path.clone(),
            config.hls_segment_duration,
        );
        Self::new(
            Arc::new(ImageTranscoder::new(
                config.image_max_width,
                config.image_jpeg_quality,
            )),
            Arc::new(VideoTranscoder::new(
                runner.clone(),
                config.ffmpeg_path.clone(),
                config.video_crf,
                segmenter.clone(),
            )),
            Arc::new(AudioTranscoder::new(
                runner,
                config.ffmpeg_path.clone(),
                config.audio_bitrate_kbps,
                segmenter,
            )),
            Arc::new(PassthroughTranscoder),
        )
    }

    pub fn for_category(&self, category: MediaCategory) -> &dyn Transcoder {
        match category {
            MediaCategory::Image => self.image.as_ref(),
            MediaCategory::Video => self.video.as_ref(),
            MediaCategory::Audio => self.audio.as_ref(),
            MediaCategory::DocumentFallback => self.document.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ProcessRunner;

    #[test]
    fn each_category_has_its_own_transcoder() {
        let config = Config::for_tests("/tmp/storyreel-scratch");
        let set = TranscoderSet::from_config(&config, Arc::new(ProcessRunner));
        for category in [
            MediaCategory::Image,
            MediaCategory::Video,
            MediaCategory::Audio,
            MediaCategory::DocumentFallback,
        ] {
            assert_eq!(set.for_category(category).category(), category);
        }
    }
}
