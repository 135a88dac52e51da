use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::media::MediaCategory;

/// Where the raw bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// In-memory upload body.
    Bytes(Bytes),
    /// A readable temp file owned by the caller. It is copied into scratch and never
    /// deleted by the pipeline.
    Path(PathBuf),
}

/// Validated file descriptor handed over by the request layer.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    source: FileSource,
    original_file_name: String,
    declared_mime_type: String,
    declared_category: Option<MediaCategory>,
    size_bytes: u64,
    custom_file_name: Option<String>,
}

impl UploadRequest {
    pub fn from_bytes(
        data: impl Into<Bytes>,
        original_file_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
    ) -> Self {
        let data = data.into();
        Self {
            size_bytes: data.len() as u64,
            source: FileSource::Bytes(data),
            original_file_name: original_file_name.into(),
            declared_mime_type: declared_mime_type.into(),
            declared_category: None,
            custom_file_name: None,
        }
    }

    /// Describe a file that already sits on disk. The size is read from its metadata.
    pub async fn from_path(
        path: impl Into<PathBuf>,
        original_file_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "upload source is not a regular file",
            ));
        }
        Ok(Self {
            size_bytes: metadata.len(),
            source: FileSource::Path(path),
            original_file_name: original_file_name.into(),
            declared_mime_type: declared_mime_type.into(),
            declared_category: None,
            custom_file_name: None,
        })
    }

    /// Declare the category the caller expects (e.g. the story type field).
    pub fn with_category(mut self, category: MediaCategory) -> Self {
        self.declared_category = Some(category);
        self
    }

    /// Use a caller-chosen base name for the remote object instead of a generated id.
    pub fn with_custom_file_name(mut self, name: impl Into<String>) -> Self {
        self.custom_file_name = Some(name.into());
        self
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn original_file_name(&self) -> &str {
        &self.original_file_name
    }

    pub fn declared_mime_type(&self) -> &str {
        &self.declared_mime_type
    }

    pub fn declared_category(&self) -> Option<MediaCategory> {
        self.declared_category
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn custom_file_name(&self) -> Option<&str> {
        self.custom_file_name.as_deref()
    }

    /// Lowercase extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }
}

/// An upload written into the scratch directory for one job.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub local_path: PathBuf,
    pub size_bytes: u64,
    pub original_file_name: String,
    pub declared_mime_type: String,
}

impl StagedFile {
    /// Lowercase extension of the name the caller uploaded, which the local name may
    /// have lost to sanitizing.
    pub fn original_extension(&self) -> Option<String> {
        Path::new(&self.original_file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }
}
