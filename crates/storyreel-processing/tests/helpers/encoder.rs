//! Fake ffmpeg. Writes the files the real encoder would write and records every call.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use storyreel_processing::hls::PLAYLIST_FILE_NAME;
use storyreel_processing::{CommandRunner, ToolCommand, ToolError, ToolOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Compress,
    Segment,
}

pub struct FakeEncoder {
    segments: usize,
    fail_at: Option<FailAt>,
    commands: Mutex<Vec<ToolCommand>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::with_segments(3)
    }

    pub fn with_segments(segments: usize) -> Self {
        Self {
            segments,
            fail_at: None,
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, stage: FailAt) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn is_segmenting(command: &ToolCommand) -> bool {
        command.value_of("-f") == Some("hls")
    }

    async fn write_hls(&self, command: &ToolCommand) {
        let playlist_path = PathBuf::from(command.args.last().unwrap());
        let dir = playlist_path.parent().unwrap().to_path_buf();
        let mut listed = Vec::new();
        for i in 0..self.segments {
            let name = format!("segment_{:03}.ts", i);
            tokio::fs::write(dir.join(&name), vec![0x47u8; 188]).await.unwrap();
            listed.push((15.0, name));
        }
        assert_eq!(playlist_path.file_name().unwrap(), PLAYLIST_FILE_NAME);
        tokio::fs::write(&playlist_path, render_vod_playlist(15, &listed))
            .await
            .unwrap();
    }
}

/// VOD media playlist in the shape ffmpeg's HLS muxer writes.
pub fn render_vod_playlist(target_duration: u64, segments: &[(f64, String)]) -> String {
    let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");
    out.push_str(&format!("#EXT-X-TARGETDURATION:{}\n", target_duration));
    out.push_str("#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n");
    for (duration, uri) in segments {
        out.push_str(&format!("#EXTINF:{:.6},\n{}\n", duration, uri));
    }
    out.push_str("#EXT-X-ENDLIST\n");
    out
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for FakeEncoder {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        self.commands.lock().unwrap().push(command.clone());

        let stage = if Self::is_segmenting(command) {
            FailAt::Segment
        } else {
            FailAt::Compress
        };
        if self.fail_at == Some(stage) {
            return Ok(ToolOutput {
                status_code: Some(1),
                stderr: "Conversion failed!".to_string(),
            });
        }

        match stage {
            FailAt::Segment => self.write_hls(command).await,
            FailAt::Compress => {
                let input = command.value_of("-i").unwrap();
                let output = command.args.last().unwrap();
                let data = tokio::fs::read(input).await.unwrap();
                tokio::fs::write(output, data).await.unwrap();
            }
        }

        Ok(ToolOutput {
            status_code: Some(0),
            stderr: String::new(),
        })
    }
}
