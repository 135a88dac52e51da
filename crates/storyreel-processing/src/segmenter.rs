use std::path::{Path, PathBuf};
use std::sync::Arc;

use storyreel_core::{JobStage, MediaCategory, PipelineError, PipelineResult, TranscodeOutput};

use crate::hls::{is_local_segment_uri, parse_segment_uris, PLAYLIST_FILE_NAME, SEGMENT_PATTERN};
use crate::staging::JobContext;
use crate::tool::{run_external_tool, CommandRunner, ToolCommand, ToolError};

/// Splits a compressed media file into a VOD HLS playlist plus fixed-duration segments.
#[derive(Clone)]
pub struct Segmenter {
    runner: Arc<dyn CommandRunner>,
    ffmpeg_path: String,
    segment_duration: u64,
}

impl Segmenter {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ffmpeg_path: impl Into<String>,
        segment_duration: u64,
    ) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            segment_duration,
        }
    }

    pub fn segment_duration(&self) -> u64 {
        self.segment_duration
    }

    pub fn command(&self, input: &Path, chunk_dir: &Path) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .path_arg(input)
            .arg("-c")
            .arg("copy")
            .arg("-f")
            .arg("hls")
            .arg("-hls_time")
            .arg(self.segment_duration.to_string())
            .arg("-hls_playlist_type")
            .arg("vod")
            .arg("-hls_list_size")
            .arg("0")
            .arg("-start_number")
            .arg("0")
            .arg("-hls_segment_filename")
            .path_arg(&chunk_dir.join(SEGMENT_PATTERN))
            .path_arg(&chunk_dir.join(PLAYLIST_FILE_NAME))
    }

    /// Segment `input` into a fresh per-job chunk directory.
    ///
    /// Returns the playlist followed by its segments in playlist order. Every file the
    /// encoder wrote is registered with the job.
    pub async fn segment(
        &self,
        job: &mut JobContext,
        file_name: &str,
        input: &Path,
        category: MediaCategory,
    ) -> PipelineResult<TranscodeOutput> {
        let segmentation_error = |reason: &str, source: Option<anyhow::Error>| {
            PipelineError::Segmentation {
                file_name: file_name.to_string(),
                reason: reason.to_string(),
                source,
            }
        };

        let chunk_dir = job
            .allocate_dir("hls")
            .await
            .map_err(|e| segmentation_error("could not create chunk directory", Some(e.into())))?;
        let playlist_path = chunk_dir.join(PLAYLIST_FILE_NAME);
        let command = self.command(input, &chunk_dir);

        let run = run_external_tool(self.runner.as_ref(), &command, &playlist_path).await;
        // Register whatever was produced, even on failure, so nothing is left behind.
        register_dir_contents(job, &chunk_dir).await;

        match run {
            Ok(()) => {}
            Err(e @ ToolError::MissingOutput { .. }) => {
                return Err(segmentation_error("playlist was not produced", Some(e.into())));
            }
            Err(e) => {
                return Err(PipelineError::TranscodeProcess {
                    file_name: file_name.to_string(),
                    stage: JobStage::Segmenting,
                    source: e.into(),
                });
            }
        }

        let playlist = tokio::fs::read_to_string(&playlist_path)
            .await
            .map_err(|e| segmentation_error("playlist could not be read", Some(e.into())))?;
        let uris = parse_segment_uris(&playlist);
        if uris.is_empty() {
            return Err(segmentation_error("playlist lists no segments", None));
        }

        let mut segments = Vec::with_capacity(uris.len());
        for uri in &uris {
            if !is_local_segment_uri(uri) {
                return Err(segmentation_error(
                    "playlist references a segment outside its folder",
                    None,
                ));
            }
            let path = chunk_dir.join(uri);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(segmentation_error(
                    &format!("segment {} listed in playlist is missing", uri),
                    None,
                ));
            }
            segments.push(path);
        }

        tracing::info!(
            file_name = %file_name,
            category = %category,
            segment_count = segments.len(),
            segment_duration = self.segment_duration,
            "HLS segmentation complete"
        );

        Ok(TranscodeOutput::streamed(category, playlist_path, segments))
    }
}

async fn register_dir_contents(job: &mut JobContext, dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let mut produced: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        produced.push(entry.path());
    }
    produced.sort();
    for path in produced {
        job.register(path);
    }
}
