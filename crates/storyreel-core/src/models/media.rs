use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// HLS playlist content type.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
/// MPEG-TS segment content type.
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Media category of an uploaded file.
///
/// Each variant has exactly one transcoder; `DocumentFallback` covers every policy
/// entry that is stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Audio,
    #[serde(rename = "document")]
    DocumentFallback,
}

impl MediaCategory {
    /// Key segment used in remote object keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::DocumentFallback => "document",
        }
    }

    /// Whether the category is delivered as an HLS playlist plus segments.
    pub fn is_streamed(&self) -> bool {
        matches!(self, MediaCategory::Video | MediaCategory::Audio)
    }
}

impl Display for MediaCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Playlist,
    Segment,
    File,
}

/// One local file produced by a transcoder and ready for upload.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub local_path: PathBuf,
    pub content_type: String,
    pub kind: ArtifactKind,
    /// Extension to store the artifact under when the local name no longer carries it.
    pub remote_extension: Option<String>,
}

impl Artifact {
    pub fn file(local_path: PathBuf, content_type: impl Into<String>) -> Self {
        Self {
            local_path,
            content_type: content_type.into(),
            kind: ArtifactKind::File,
            remote_extension: None,
        }
    }

    pub fn playlist(local_path: PathBuf) -> Self {
        Self {
            local_path,
            content_type: PLAYLIST_CONTENT_TYPE.to_string(),
            kind: ArtifactKind::Playlist,
            remote_extension: None,
        }
    }

    pub fn segment(local_path: PathBuf) -> Self {
        Self {
            local_path,
            content_type: SEGMENT_CONTENT_TYPE.to_string(),
            kind: ArtifactKind::Segment,
            remote_extension: None,
        }
    }

    /// File name component of the local path (used in remote keys).
    pub fn file_name(&self) -> Option<&str> {
        self.local_path.file_name().and_then(|n| n.to_str())
    }

    pub fn with_remote_extension(mut self, extension: Option<String>) -> Self {
        self.remote_extension = extension;
        self
    }

    /// Lowercase extension the artifact is stored under: the override if set, otherwise
    /// the extension of the local path.
    pub fn extension(&self) -> Option<String> {
        if let Some(ext) = &self.remote_extension {
            return Some(ext.to_lowercase());
        }
        self.local_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Output of a transcoder: a single artifact, or a playlist followed by its segments.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub category: MediaCategory,
    pub artifacts: Vec<Artifact>,
}

impl TranscodeOutput {
    pub fn single(category: MediaCategory, artifact: Artifact) -> Self {
        Self {
            category,
            artifacts: vec![artifact],
        }
    }

    /// Build a streamed output. The playlist is always stored first.
    pub fn streamed(category: MediaCategory, playlist: PathBuf, segments: Vec<PathBuf>) -> Self {
        let mut artifacts = Vec::with_capacity(segments.len() + 1);
        artifacts.push(Artifact::playlist(playlist));
        artifacts.extend(segments.into_iter().map(Artifact::segment));
        Self {
            category,
            artifacts,
        }
    }

    pub fn is_streamed(&self) -> bool {
        self.artifacts
            .first()
            .map(|a| a.kind == ArtifactKind::Playlist)
            .unwrap_or(false)
    }

    pub fn segment_count(&self) -> usize {
        self.artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Segment)
            .count()
    }
}

/// A stored remote object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    pub key: String,
    pub url: String,
    pub content_type: String,
}
