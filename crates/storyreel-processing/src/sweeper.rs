//! Periodic removal of stale scratch files.
//!
//! Job contexts clean up after themselves, but a killed process never runs `Drop`.
//! The sweeper removes whatever such a process left behind once it is old enough that
//! no live job can still own it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::interval;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub failures: usize,
}

#[derive(Debug, Clone)]
pub struct ScratchSweeper {
    root: PathBuf,
    max_age: Duration,
    interval: Option<Duration>,
}

impl ScratchSweeper {
    /// `interval` of `None` disables the background loop; `sweep_once` still works.
    pub fn new(root: impl Into<PathBuf>, max_age: Duration, interval: Option<Duration>) -> Self {
        Self {
            root: root.into(),
            max_age,
            interval,
        }
    }

    pub fn from_config(config: &storyreel_core::Config) -> Self {
        Self::new(
            &config.scratch_dir,
            config.scratch_max_age(),
            config.scratch_sweep_interval(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start the background sweep. Returns `None` when sweeping is disabled.
    pub fn start(self) -> Option<tokio::task::JoinHandle<()>> {
        let period = self.interval?;
        Some(tokio::spawn(async move {
            let mut sweep_interval = interval(period);
            loop {
                sweep_interval.tick().await;

                let sweeper = self.clone();
                match tokio::task::spawn_blocking(move || sweeper.sweep_once()).await {
                    Ok(report) if report.removed_files + report.removed_dirs > 0 => {
                        tracing::info!(
                            removed_files = report.removed_files,
                            removed_dirs = report.removed_dirs,
                            failures = report.failures,
                            "Scratch sweep removed stale files"
                        );
                    }
                    Ok(report) => {
                        tracing::debug!(failures = report.failures, "Scratch sweep found nothing to remove");
                    }
                    Err(e) => tracing::error!(error = %e, "Scratch sweep task failed"),
                }
            }
        }))
    }

    /// Remove files older than the maximum age, then any directory left empty.
    /// The root itself is kept.
    pub fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = SystemTime::now();
        match fs::read_dir(&self.root) {
            Ok(_) => self.sweep_dir(&self.root, now, &mut report),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.root.display(), error = %e, "Cannot read scratch directory");
                report.failures += 1;
            }
        }
        report
    }

    fn sweep_dir(&self, dir: &Path, now: SystemTime, report: &mut SweepReport) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Cannot read scratch subdirectory");
                report.failures += 1;
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };

            if metadata.is_dir() {
                self.sweep_dir(&path, now, report);
                if is_empty_dir(&path) && self.is_stale(&metadata, now) {
                    match fs::remove_dir(&path) {
                        Ok(()) => report.removed_dirs += 1,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale scratch directory");
                            report.failures += 1;
                        }
                    }
                }
            } else if self.is_stale(&metadata, now) {
                match fs::remove_file(&path) {
                    Ok(()) => report.removed_files += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale scratch file");
                        report.failures += 1;
                    }
                }
            }
        }
    }

    fn is_stale(&self, metadata: &fs::Metadata, now: SystemTime) -> bool {
        metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= self.max_age)
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn zero_max_age_removes_everything_but_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("scratch");
        fs::create_dir_all(root.join("123_abc.hls")).unwrap();
        fs::write(root.join("123_abc.hls").join("segment_000.ts"), b"ts").unwrap();
        fs::write(root.join("123_abc_clip.mp4"), b"mp4").unwrap();

        let report = ScratchSweeper::new(&root, Duration::ZERO, None).sweep_once();

        assert_eq!(report.removed_files, 2);
        assert_eq!(report.removed_dirs, 1);
        assert_eq!(report.failures, 0);
        assert!(root.exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn fresh_files_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("live_job.jpg"), b"jpg").unwrap();

        let report =
            ScratchSweeper::new(dir.path(), Duration::from_secs(3600), None).sweep_once();

        assert_eq!(report, SweepReport::default());
        assert!(dir.path().join("live_job.jpg").exists());
    }

    #[test]
    fn missing_root_is_not_a_failure() {
        let dir = tempdir().unwrap();
        let report =
            ScratchSweeper::new(dir.path().join("absent"), Duration::ZERO, None).sweep_once();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn disabled_sweeper_does_not_start() {
        let dir = tempdir().unwrap();
        assert!(ScratchSweeper::new(dir.path(), Duration::ZERO, None)
            .start()
            .is_none());
    }

    #[tokio::test]
    async fn started_sweeper_removes_leftovers_until_aborted() {
        let dir = tempdir().unwrap();
        let leftover = dir.path().join("123_abc_killed.png");
        fs::write(&leftover, b"png").unwrap();

        let handle = ScratchSweeper::new(dir.path(), Duration::ZERO, Some(Duration::from_millis(10)))
            .start()
            .unwrap();
        for _ in 0..100 {
            if !leftover.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!leftover.exists());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(dir.path().exists());
    }
}
