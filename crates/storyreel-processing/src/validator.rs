use storyreel_core::{MediaCategory, PipelineError, PipelineResult, PolicyLimits, UploadRequest};

/// Closed extension table. Extension sets are fixed; size limits come from [`PolicyLimits`].
const POLICY_TABLE: &[(MediaCategory, &[&str])] = &[
    (
        MediaCategory::Image,
        &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"],
    ),
    (MediaCategory::DocumentFallback, &["pdf", "doc", "docx", "txt"]),
    (MediaCategory::Video, &["mp4", "avi", "mov", "wmv"]),
    (MediaCategory::Audio, &["mp3", "wav", "ogg"]),
];

/// Category of an extension according to the policy table (case-insensitive).
pub fn category_for_extension(extension: &str) -> Option<MediaCategory> {
    let extension = extension.to_lowercase();
    POLICY_TABLE
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(category, _)| *category)
}

/// Every extension accepted for a category.
pub fn extensions_for(category: MediaCategory) -> &'static [&'static str] {
    POLICY_TABLE
        .iter()
        .find(|(c, _)| *c == category)
        .map(|(_, extensions)| *extensions)
        .unwrap_or(&[])
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMedia {
    pub category: MediaCategory,
    pub extension: String,
    pub max_size_bytes: u64,
}

/// Media file validator
///
/// Classifies a file by extension and enforces the per-category size limit. Pure: it
/// never touches the filesystem, so a rejected file leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct MediaValidator {
    limits: PolicyLimits,
}

impl MediaValidator {
    pub fn new(limits: PolicyLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &PolicyLimits {
        &self.limits
    }

    pub fn validate(&self, request: &UploadRequest) -> PipelineResult<ValidatedMedia> {
        let file_name = request.original_file_name();

        let extension = request
            .extension()
            .ok_or_else(|| PipelineError::UnsupportedType {
                file_name: file_name.to_string(),
                reason: "file has no extension".to_string(),
            })?;

        let category =
            category_for_extension(&extension).ok_or_else(|| PipelineError::UnsupportedType {
                file_name: file_name.to_string(),
                reason: format!("extension .{} is not allowed", extension),
            })?;

        if let Some(declared) = request.declared_category() {
            if declared != category {
                return Err(PipelineError::UnsupportedType {
                    file_name: file_name.to_string(),
                    reason: format!(
                        "declared category {} does not match {} file extension .{}",
                        declared, category, extension
                    ),
                });
            }
        }

        let max_size_bytes = self.limits.max_bytes(category);
        let size_bytes = request.size_bytes();
        if size_bytes > max_size_bytes {
            return Err(PipelineError::SizeExceeded {
                file_name: file_name.to_string(),
                category,
                size_bytes,
                max_bytes: max_size_bytes,
            });
        }

        tracing::debug!(
            file_name = %file_name,
            category = %category,
            size_bytes = size_bytes,
            "File validated"
        );

        Ok(ValidatedMedia {
            category,
            extension,
            max_size_bytes,
        })
    }
}
