//! Image transcoding
//!
//! Images are re-encoded as JPEG, scaled down to a maximum width. They are never
//! upscaled.

pub mod compressor;
pub mod transcoder;

pub use compressor::{compress_to_jpeg, CompressedImage};
pub use transcoder::ImageTranscoder;

/// Content type of every transcoded image.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
