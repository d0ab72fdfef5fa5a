//! Atomic publication of the status line
//!
//! The text is written to a temporary file next to the target and renamed over
//! it, so a reader of the output path sees either the old or the new content.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors from publishing the status line
#[derive(Debug, Error)]
pub enum PublishError {
    /// The temporary file could not be created or written
    #[error("failed to write status to a temporary file in {dir}: {source}")]
    Io {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The temporary file could not be renamed over the output path
    #[error("failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the status line to a fixed output path
#[derive(Debug, Clone)]
pub struct Publisher {
    path: PathBuf,
}

impl Publisher {
    /// Creates a publisher for `path`
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the output file's content with exactly `text`
    pub fn publish(&self, text: &str) -> Result<(), PublishError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_err = |source| PublishError::Io {
            dir: dir.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| PublishError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(path = %self.path.display(), "published status");
        Ok(())
    }
}
