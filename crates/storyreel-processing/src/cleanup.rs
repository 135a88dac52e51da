//! Scratch cleanup for a finished job.
//!
//! Runs synchronously so it can be called from `Drop`. Every tracked path is attempted
//! and failures are logged, never returned as errors.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_files: usize,
    pub removed_dirs: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove every tracked path, then each parent left empty, stopping at `scratch_root`.
///
/// Files go first, then tracked directories (with whatever the encoder left inside them).
/// The scratch root itself is never removed.
pub fn cleanup_tracked(scratch_root: &Path, paths: &[PathBuf]) -> CleanupReport {
    let mut report = CleanupReport::default();
    let (dirs, files): (Vec<&PathBuf>, Vec<&PathBuf>) = paths.iter().partition(|p| p.is_dir());

    for path in &files {
        match fs::remove_file(path) {
            Ok(()) => report.removed_files += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove scratch file");
                report.failures.push(((*path).clone(), e.to_string()));
            }
        }
    }

    for dir in &dirs {
        if dir.as_path() == scratch_root {
            continue;
        }
        match fs::remove_dir_all(dir) {
            Ok(()) => report.removed_dirs += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to remove scratch directory");
                report.failures.push(((*dir).clone(), e.to_string()));
            }
        }
    }

    for path in files.iter().chain(dirs.iter()) {
        report.removed_dirs += remove_empty_parents(scratch_root, path);
    }

    tracing::debug!(
        removed_files = report.removed_files,
        removed_dirs = report.removed_dirs,
        failures = report.failures.len(),
        "Scratch cleanup finished"
    );

    report
}

/// Walk upward from `path`'s parent removing empty directories below `scratch_root`.
fn remove_empty_parents(scratch_root: &Path, path: &Path) -> usize {
    let mut removed = 0;
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == scratch_root || !dir.starts_with(scratch_root) {
            break;
        }
        // remove_dir only succeeds on an empty directory.
        match fs::remove_dir(dir) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(_) => break,
        }
        current = dir.parent();
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removes_files_and_tracked_dirs() {
        let root = tempdir().unwrap();
        let file = root.path().join("1_abc_photo.png");
        let chunk_dir = root.path().join("1_abc_hls");
        fs::write(&file, b"x").unwrap();
        fs::create_dir(&chunk_dir).unwrap();
        fs::write(chunk_dir.join("index.m3u8"), b"#EXTM3U").unwrap();
        fs::write(chunk_dir.join("segment_000.ts"), b"ts").unwrap();

        let tracked = vec![
            file.clone(),
            chunk_dir.clone(),
            chunk_dir.join("index.m3u8"),
            chunk_dir.join("segment_000.ts"),
        ];
        let report = cleanup_tracked(root.path(), &tracked);

        assert!(report.is_clean());
        assert_eq!(report.removed_files, 3);
        assert!(!file.exists());
        assert!(!chunk_dir.exists());
        assert!(root.path().exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn walks_up_empty_parents_but_keeps_root_and_non_empty_dirs() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("x.bin");
        fs::write(&file, b"x").unwrap();
        fs::write(root.path().join("a").join("keep.txt"), b"keep").unwrap();

        let report = cleanup_tracked(root.path(), &[file.clone()]);

        assert_eq!(report.removed_files, 1);
        assert_eq!(report.removed_dirs, 1);
        assert!(!nested.exists());
        assert!(root.path().join("a").exists());
    }

    #[test]
    fn missing_paths_are_not_failures() {
        let root = tempdir().unwrap();
        let report = cleanup_tracked(root.path(), &[root.path().join("gone.jpg")]);
        assert!(report.is_clean());
        assert_eq!(report.removed_files, 0);
        assert!(root.path().exists());
    }

    #[test]
    fn never_removes_scratch_root() {
        let root = tempdir().unwrap();
        let report = cleanup_tracked(root.path(), &[root.path().to_path_buf()]);
        assert!(report.is_clean());
        assert!(root.path().exists());
    }
}
