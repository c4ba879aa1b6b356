//! Playlist discovery.
//!
//! A playlist is the sorted list of AVI files directly inside one directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Files to play, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    files: Vec<PathBuf>,
}

impl Playlist {
    /// A playlist of one file.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![path.into()],
        }
    }

    /// Collect the regular files in `dir` (not recursive) whose extension is
    /// one of `extensions`, ignoring case, sorted by path.
    pub fn scan(dir: &Path, extensions: &[String]) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Not a directory: {:?}", dir);
        }
        info!("Scanning directory: {:?}", dir);

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if has_extension(path, extensions) {
                debug!("Found {:?}", path);
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            anyhow::bail!("No AVI files found in {:?}", dir);
        }

        files.sort();
        info!("Found {} AVI files", files.len());
        Ok(Self { files })
    }

    /// A directory becomes a scanned playlist, anything else a single file.
    pub fn from_path(path: &Path, extensions: &[String]) -> Result<Self> {
        if path.is_dir() {
            Self::scan(path, extensions)
        } else {
            Ok(Self::single(path))
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn avi() -> Vec<String> {
        vec!["avi".to_string()]
    }

    #[test]
    fn test_scan_sorted_case_insensitive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.avi"), b"").unwrap();
        fs::write(dir.path().join("a.AVI"), b"").unwrap();
        fs::write(dir.path().join("c.mp4"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let playlist = Playlist::scan(dir.path(), &avi()).unwrap();
        let names: Vec<_> = playlist
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.AVI", "b.avi"]);
    }

    #[test]
    fn test_scan_is_not_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/deep.avi"), b"").unwrap();
        fs::write(dir.path().join("top.avi"), b"").unwrap();

        let playlist = Playlist::scan(dir.path(), &avi()).unwrap();
        assert_eq!(playlist.len(), 1);
        assert!(playlist.files()[0].ends_with("top.avi"));
    }

    #[test]
    fn test_scan_skips_directories_named_like_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.avi")).unwrap();
        fs::write(dir.path().join("clip.avi"), b"").unwrap();

        let playlist = Playlist::scan(dir.path(), &avi()).unwrap();
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();

        let err = Playlist::scan(dir.path(), &avi()).unwrap_err();
        assert!(err.to_string().contains("No AVI files found"));
    }

    #[test]
    fn test_from_path_file() {
        let playlist = Playlist::from_path(Path::new("/videos/clip.avi"), &avi()).unwrap();
        assert_eq!(playlist, Playlist::single("/videos/clip.avi"));
        assert!(!playlist.is_empty());
    }
}
