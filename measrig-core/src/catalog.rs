//! Nearest-size lookup over a pool of video files
//!
//! The workload generator picks source videos by target size. Pool files
//! are named `<id>_<size>.<ext>` with the size in bytes, so the catalog is
//! a directory scan plus a sorted lookup; anything that does not match the
//! naming scheme is skipped.

use std::path::{Path, PathBuf};

use crate::error::{RigError, RigResult};

/// One pool entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path of the video file
    pub path: PathBuf,
    /// Actual size in bytes, as encoded in the file name
    pub size: u64,
}

/// Size-indexed catalog of a video pool directory
#[derive(Debug, Clone)]
pub struct VideoCatalog {
    entries: Vec<CatalogEntry>,
}

impl VideoCatalog {
    /// Scans `pool` for `<id>_<size>.<ext>` files.
    ///
    /// # Errors
    /// [`RigError::Io`] when the directory cannot be read;
    /// [`RigError::Configuration`] when no file matches the scheme.
    pub fn scan(pool: &Path) -> RigResult<Self> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(pool)? {
            let path = entry?.path();
            if let Some(size) = encoded_size(&path) {
                entries.push(CatalogEntry { path, size });
            }
        }
        if entries.is_empty() {
            return Err(RigError::Configuration(format!(
                "no <id>_<size> video files in {}",
                pool.display()
            )));
        }
        entries.sort_by_key(|e| e.size);
        Ok(Self { entries })
    }

    /// Number of catalogued files
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog holds no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The file whose size is nearest to `size` (ties go to the smaller)
    #[must_use]
    pub fn nearest(&self, size: u64) -> &CatalogEntry {
        let idx = match self.entries.binary_search_by_key(&size, |e| e.size) {
            Ok(idx) => idx,
            Err(idx) => {
                if idx == 0 {
                    0
                } else if idx == self.entries.len() {
                    idx - 1
                } else {
                    let below = &self.entries[idx - 1];
                    let above = &self.entries[idx];
                    if size - below.size <= above.size - size {
                        idx - 1
                    } else {
                        idx
                    }
                }
            }
        };
        &self.entries[idx]
    }
}

/// Extracts the size a pool file name encodes (`<id>_<size>.<ext>`)
fn encoded_size(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let (_, size) = stem.rsplit_once('_')?;
    size.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn test_scan_skips_non_matching_names() {
        let dir = pool_with(&["1_1000.mp4", "2_5000.mp4", "README.txt", "noscheme.mp4"]);
        let catalog = VideoCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_scan_empty_pool_is_configuration_error() {
        let dir = pool_with(&["README.txt"]);
        assert!(matches!(
            VideoCatalog::scan(dir.path()).unwrap_err(),
            RigError::Configuration(_)
        ));
    }

    #[test]
    fn test_nearest_picks_closest_size() {
        let dir = pool_with(&["1_1000.mp4", "2_5000.mp4", "3_20000.mp4"]);
        let catalog = VideoCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.nearest(900).size, 1000);
        assert_eq!(catalog.nearest(4000).size, 5000);
        assert_eq!(catalog.nearest(12_000).size, 5000);
        assert_eq!(catalog.nearest(1_000_000).size, 20_000);
    }

    #[test]
    fn test_nearest_tie_goes_to_smaller() {
        let dir = pool_with(&["1_1000.mp4", "2_3000.mp4"]);
        let catalog = VideoCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.nearest(2000).size, 1000);
    }
}
