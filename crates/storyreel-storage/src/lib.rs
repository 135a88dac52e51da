//! Storyreel Storage Library
//!
//! This crate provides the remote object store abstraction used by the media pipeline,
//! with implementations for S3 (and S3-compatible providers) and the local filesystem.
//!
//! # Storage key format
//!
//! - **Single artifact** (image, document): `{prefix}/{category}/{id}.{ext}`
//! - **Streamed media** (video, audio): `{prefix}/{category}/{id}/{file_name}` for the
//!   playlist and every segment, so relative references inside the playlist resolve.
//!
//! Keys must not contain `..`, empty segments or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use storyreel_core::StorageBackend;
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult};
