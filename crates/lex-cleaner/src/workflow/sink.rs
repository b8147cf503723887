//! Persisting generated source.

use crate::error::{Result, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for generated routines.
pub trait SourceSink: Send + Sync {
    /// Store `source` under `file_name`, replacing any earlier content.
    /// Returns where it was written.
    fn save(&self, source: &str, file_name: &str) -> Result<PathBuf>;
}

/// Writes source files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct FileSourceSink {
    dir: PathBuf,
}

impl FileSourceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SourceSink for FileSourceSink {
    fn save(&self, source: &str, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .context(format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file_name);
        fs::write(&path, source).context(format!("Failed to write {}", path.display()))?;
        info!("Code saved to: {}", path.display());
        Ok(path)
    }
}
