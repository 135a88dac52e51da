use std::path::Path;

use storyreel_core::MediaCategory;

/// MIME type to declare for a local file, from its extension.
///
/// Unknown extensions get `application/octet-stream`; the pipeline rejects them anyway.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// Parse a `--category` value.
pub fn parse_category(value: &str) -> Result<MediaCategory, String> {
    match value.to_lowercase().as_str() {
        "image" => Ok(MediaCategory::Image),
        "video" => Ok(MediaCategory::Video),
        "audio" => Ok(MediaCategory::Audio),
        "document" => Ok(MediaCategory::DocumentFallback),
        _ => Err("Invalid category. Must be: image, video, audio, or document".to_string()),
    }
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storyreel=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
