//! Local filesystem input source.
//!
//! Walks a directory tree for raster files by extension.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::PyramidError;

/// Options for scanning local directories.
#[derive(Debug, Clone)]
pub struct LocalScanOptions {
    /// Minimum directory depth to scan (0 = include root files)
    pub min_depth: usize,
    /// Maximum directory depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// File extensions to consider as rasters (case-insensitive)
    pub extensions: Vec<String>,
    /// Whether to follow symbolic links
    pub follow_links: bool,
}

impl Default for LocalScanOptions {
    fn default() -> Self {
        Self {
            min_depth: 0,
            max_depth: None,
            extensions: vec![
                "tif".to_string(),
                "tiff".to_string(),
                "geotiff".to_string(),
                "geotif".to_string(),
            ],
            follow_links: false,
        }
    }
}

impl LocalScanOptions {
    /// Only files directly inside the root directory
    #[must_use]
    pub fn flat() -> Self {
        Self {
            max_depth: Some(1),
            ..Default::default()
        }
    }

    /// Recursive scanning with no depth limit
    #[must_use]
    pub fn recursive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_min_depth(mut self, depth: usize) -> Self {
        self.min_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Replace the accepted extensions
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Raster files found under a directory, in sorted path order.
#[derive(Debug, Clone)]
pub struct LocalInputSource {
    root: PathBuf,
    files: Vec<PathBuf>,
    total_size_bytes: u64,
}

impl LocalInputSource {
    /// Scan a directory for raster files.
    ///
    /// Unreadable entries are logged and skipped.
    ///
    /// # Errors
    /// Returns [`PyramidError::MissingInputDirectory`] if `root` does not exist.
    pub fn scan<P: AsRef<Path>>(root: P, options: &LocalScanOptions) -> Result<Self, PyramidError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(PyramidError::MissingInputDirectory(root.to_path_buf()));
        }

        let mut walker = WalkDir::new(root)
            .min_depth(options.min_depth)
            .follow_links(options.follow_links);
        if let Some(max) = options.max_depth {
            walker = walker.max_depth(max);
        }

        let mut files = Vec::new();
        let mut total_size_bytes = 0;
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !options.accepts(path) {
                continue;
            }
            total_size_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            debug!(path = %path.display(), "Discovered input raster");
            files.push(path.to_path_buf());
        }
        files.sort();

        Ok(Self {
            root: root.to_path_buf(),
            files,
            total_size_bytes,
        })
    }

    /// The directory that was scanned.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> LocalSourceStats {
        LocalSourceStats {
            file_count: self.files.len(),
            total_size_bytes: self.total_size_bytes,
        }
    }
}

/// Statistics about a local input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSourceStats {
    /// Number of raster files discovered
    pub file_count: usize,
    /// Total size of all files in bytes
    pub total_size_bytes: u64,
}

impl LocalSourceStats {
    /// Get total size in megabytes
    #[must_use]
    pub fn total_size_mb(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        { self.total_size_bytes as f64 / 1024.0 / 1024.0 }
    }
}
