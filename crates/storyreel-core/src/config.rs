//! Configuration module
//!
//! Environment-driven settings for the pipeline: scratch space, storage backend,
//! encoder parameters and per-category size limits.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::MediaCategory;
use crate::storage_types::StorageBackend;

const MB: u64 = 1024 * 1024;

const SCRATCH_DIR: &str = "uploads/temp";
const FFMPEG_PATH: &str = "ffmpeg";
const VIDEO_CRF: u8 = 28;
const AUDIO_BITRATE_KBPS: u32 = 128;
const HLS_SEGMENT_DURATION: u64 = 15;
const IMAGE_MAX_WIDTH: u32 = 1080;
const IMAGE_JPEG_QUALITY: u8 = 80;
const MAX_IMAGE_SIZE_MB: u64 = 10;
const MAX_DOCUMENT_SIZE_MB: u64 = 50;
const MAX_VIDEO_SIZE_MB: u64 = 100;
const MAX_AUDIO_SIZE_MB: u64 = 20;
const MAX_CONCURRENT_JOBS: usize = 2;
const SCRATCH_SWEEP_INTERVAL_SECS: u64 = 3600;
const SCRATCH_MAX_AGE_SECS: u64 = 86400;

/// Maximum accepted size per media category, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyLimits {
    pub image_bytes: u64,
    pub document_bytes: u64,
    pub video_bytes: u64,
    pub audio_bytes: u64,
}

impl PolicyLimits {
    pub fn max_bytes(&self, category: MediaCategory) -> u64 {
        match category {
            MediaCategory::Image => self.image_bytes,
            MediaCategory::DocumentFallback => self.document_bytes,
            MediaCategory::Video => self.video_bytes,
            MediaCategory::Audio => self.audio_bytes,
        }
    }
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            image_bytes: MAX_IMAGE_SIZE_MB * MB,
            document_bytes: MAX_DOCUMENT_SIZE_MB * MB,
            video_bytes: MAX_VIDEO_SIZE_MB * MB,
            audio_bytes: MAX_AUDIO_SIZE_MB * MB,
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub scratch_dir: PathBuf,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub aws_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO, Spaces, ...)
    pub storage_host: Option<String>,
    pub local_storage_path: Option<PathBuf>,
    pub local_storage_base_url: Option<String>,
    // Encoder configuration
    pub ffmpeg_path: String,
    pub video_crf: u8,
    pub audio_bitrate_kbps: u32,
    pub hls_segment_duration: u64,
    pub image_max_width: u32,
    pub image_jpeg_quality: u8,
    pub limits: PolicyLimits,
    pub max_concurrent_jobs: usize,
    /// Interval between scratch sweeps. 0 = disabled.
    pub scratch_sweep_interval_secs: u64,
    pub scratch_max_age_secs: u64,
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let config = Config {
            environment,
            scratch_dir: PathBuf::from(
                env::var("SCRATCH_DIR").unwrap_or_else(|_| SCRATCH_DIR.to_string()),
            ),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            aws_region: env_opt("AWS_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            storage_host: env_opt("STORAGE_HOST"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH").map(PathBuf::from),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| FFMPEG_PATH.to_string()),
            video_crf: env_parse("VIDEO_CRF", VIDEO_CRF),
            audio_bitrate_kbps: env_parse("AUDIO_BITRATE_KBPS", AUDIO_BITRATE_KBPS),
            hls_segment_duration: env_parse("HLS_SEGMENT_DURATION", HLS_SEGMENT_DURATION),
            image_max_width: env_parse("IMAGE_MAX_WIDTH", IMAGE_MAX_WIDTH),
            image_jpeg_quality: env_parse("IMAGE_JPEG_QUALITY", IMAGE_JPEG_QUALITY),
            limits: PolicyLimits {
                image_bytes: env_parse("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB) * MB,
                document_bytes: env_parse("MAX_DOCUMENT_SIZE_MB", MAX_DOCUMENT_SIZE_MB) * MB,
                video_bytes: env_parse("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB) * MB,
                audio_bytes: env_parse("MAX_AUDIO_SIZE_MB", MAX_AUDIO_SIZE_MB) * MB,
            },
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS", MAX_CONCURRENT_JOBS),
            scratch_sweep_interval_secs: env_parse(
                "SCRATCH_SWEEP_INTERVAL_SECS",
                SCRATCH_SWEEP_INTERVAL_SECS,
            ),
            scratch_max_age_secs: env_parse("SCRATCH_MAX_AGE_SECS", SCRATCH_MAX_AGE_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Local-backend configuration rooted at `scratch_dir`, independent of the environment.
    pub fn for_tests(scratch_dir: impl Into<PathBuf>) -> Self {
        let scratch_dir = scratch_dir.into();
        Config {
            environment: "test".to_string(),
            local_storage_path: Some(scratch_dir.join("store")),
            scratch_dir,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            aws_region: None,
            s3_endpoint: None,
            storage_host: None,
            local_storage_base_url: Some("http://localhost:8080/media".to_string()),
            ffmpeg_path: FFMPEG_PATH.to_string(),
            video_crf: VIDEO_CRF,
            audio_bitrate_kbps: AUDIO_BITRATE_KBPS,
            hls_segment_duration: HLS_SEGMENT_DURATION,
            image_max_width: IMAGE_MAX_WIDTH,
            image_jpeg_quality: IMAGE_JPEG_QUALITY,
            limits: PolicyLimits::default(),
            max_concurrent_jobs: MAX_CONCURRENT_JOBS,
            scratch_sweep_interval_secs: 0,
            scratch_max_age_secs: SCRATCH_MAX_AGE_SECS,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.video_crf > 51 {
            return Err(anyhow::anyhow!("VIDEO_CRF must be between 0 and 51"));
        }

        if !(1..=100).contains(&self.image_jpeg_quality) {
            return Err(anyhow::anyhow!("IMAGE_JPEG_QUALITY must be between 1 and 100"));
        }

        if self.image_max_width == 0 {
            return Err(anyhow::anyhow!("IMAGE_MAX_WIDTH must be greater than 0"));
        }

        if !(1..=60).contains(&self.hls_segment_duration) {
            return Err(anyhow::anyhow!(
                "HLS_SEGMENT_DURATION must be between 1 and 60 seconds"
            ));
        }

        if self.audio_bitrate_kbps == 0 {
            return Err(anyhow::anyhow!("AUDIO_BITRATE_KBPS must be greater than 0"));
        }

        if self.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_JOBS must be at least 1"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Region used for S3, preferring `S3_REGION` over `AWS_REGION`.
    pub fn region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn scratch_sweep_interval(&self) -> Option<Duration> {
        (self.scratch_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.scratch_sweep_interval_secs))
    }

    pub fn scratch_max_age(&self) -> Duration {
        Duration::from_secs(self.scratch_max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_policy_table() {
        let limits = PolicyLimits::default();
        assert_eq!(limits.max_bytes(MediaCategory::Image), 10 * MB);
        assert_eq!(limits.max_bytes(MediaCategory::DocumentFallback), 50 * MB);
        assert_eq!(limits.max_bytes(MediaCategory::Video), 100 * MB);
        assert_eq!(limits.max_bytes(MediaCategory::Audio), 20 * MB);
    }

    #[test]
    fn test_config_is_valid() {
        let config = Config::for_tests("/tmp/storyreel-scratch");
        assert!(config.validate().is_ok());
        assert_eq!(config.video_crf, 28);
        assert_eq!(config.audio_bitrate_kbps, 128);
        assert_eq!(config.hls_segment_duration, 15);
        assert_eq!(config.image_max_width, 1080);
        assert_eq!(config.image_jpeg_quality, 80);
        assert!(config.scratch_sweep_interval().is_none());
    }

    #[test]
    fn s3_backend_requires_bucket_and_region() {
        let mut config = Config::for_tests("/tmp/storyreel-scratch");
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("stories".to_string());
        assert!(config.validate().is_err());

        config.aws_region = Some("eu-west-1".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.region(), Some("eu-west-1"));

        config.s3_region = Some("us-east-1".to_string());
        assert_eq!(config.region(), Some("us-east-1"));
    }

    #[test]
    fn rejects_out_of_range_encoder_settings() {
        let mut config = Config::for_tests("/tmp/storyreel-scratch");
        config.video_crf = 52;
        assert!(config.validate().is_err());

        let mut config = Config::for_tests("/tmp/storyreel-scratch");
        config.image_jpeg_quality = 0;
        assert!(config.validate().is_err());

        let mut config = Config::for_tests("/tmp/storyreel-scratch");
        config.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());
    }
}
