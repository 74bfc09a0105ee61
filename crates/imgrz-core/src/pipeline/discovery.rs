//! Directory scanning for image files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{PipelineError, PipelineResult};

/// Finds image files in a directory.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// List supported image files in `dir`.
    ///
    /// Only the top level is listed unless `recursive` is set. Fails with
    /// [`PipelineError::Scan`] when `dir` is missing, not a directory, or
    /// unreadable. Unreadable entries below the top level are skipped.
    pub fn scan(&self, dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        let scan_error = |message: String| PipelineError::Scan {
            path: dir.to_path_buf(),
            message,
        };

        let meta = std::fs::metadata(dir).map_err(|e| scan_error(e.to_string()))?;
        if !meta.is_dir() {
            return Err(scan_error("not a directory".to_string()));
        }
        // Surface permission errors on the root instead of yielding nothing
        std::fs::read_dir(dir).map_err(|e| scan_error(e.to_string()))?;

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry under {:?}: {}", dir, e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        // Sort by path for deterministic ordering
        files.sort();
        tracing::debug!("Scanned {:?}: {} image(s)", dir, files.len());
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
