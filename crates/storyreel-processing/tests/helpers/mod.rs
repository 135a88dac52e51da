//! Test helpers: an in-memory store, a fake encoder and a pipeline wired to both.
//!
//! Run from workspace root: `cargo test -p storyreel-processing`.

#![allow(dead_code)]

pub mod encoder;
pub mod fixtures;
pub mod storage;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use storyreel_core::{Config, PolicyLimits};
use storyreel_processing::MediaPipeline;
use tempfile::TempDir;

use encoder::FakeEncoder;
use storage::MockStorage;

/// Pipeline plus the fakes behind it.
pub struct TestPipeline {
    pub pipeline: MediaPipeline,
    pub storage: Arc<MockStorage>,
    pub encoder: Arc<FakeEncoder>,
    pub scratch: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestPipeline {
    pub fn snapshot(&self) -> BTreeSet<PathBuf> {
        scratch_snapshot(&self.scratch)
    }
}

pub fn setup_pipeline() -> TestPipeline {
    setup_pipeline_with(FakeEncoder::new(), PolicyLimits::default())
}

pub fn setup_pipeline_with(encoder: FakeEncoder, limits: PolicyLimits) -> TestPipeline {
    setup_pipeline_configured(encoder, |config| config.limits = limits)
}

/// Build a pipeline from a test config adjusted by `configure`.
pub fn setup_pipeline_configured(
    encoder: FakeEncoder,
    configure: impl FnOnce(&mut Config),
) -> TestPipeline {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let scratch = temp_dir.path().join("uploads").join("temp");
    std::fs::create_dir_all(&scratch).expect("Failed to create scratch directory");

    let mut config = Config::for_tests(&scratch);
    configure(&mut config);

    let storage = Arc::new(MockStorage::new());
    let encoder = Arc::new(encoder);
    let pipeline = MediaPipeline::from_config(&config, storage.clone(), encoder.clone());

    TestPipeline {
        pipeline,
        storage,
        encoder,
        scratch,
        _temp_dir: temp_dir,
    }
}

/// Every path below `root`. A missing root is an empty snapshot.
pub fn scratch_snapshot(root: &Path) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path.clone());
            }
            paths.insert(path);
        }
    }
    paths
}
