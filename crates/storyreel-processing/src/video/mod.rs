//! Video transcoding
//!
//! Two stages: CRF compression with a broadly compatible codec, then HLS segmentation
//! of the compressed file. Audio reuses the same stage runner with its own encoder
//! arguments.

pub mod state;
pub mod transcoder;

pub(crate) use transcoder::compress_and_segment;
pub use state::{StageTracker, VideoState};
pub use transcoder::VideoTranscoder;
