//! Per-item error taxonomy for downloads, imports and catalog operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported for a single source identifier or catalog entry.
///
/// None of these abort a batch; they travel with the item's outcome.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Book {source_id} already exists: {}", path.display())]
    AlreadyImported { source_id: String, path: PathBuf },

    #[error("Failed to download {source_id}: {reason}")]
    DownloadFailed { source_id: String, reason: String },

    #[error("Expected exactly one {pattern} file in {}, found {found}", dir.display())]
    AmbiguousOutput {
        dir: PathBuf,
        pattern: String,
        found: usize,
    },

    #[error("Store entry for {source_id} was committed concurrently: {}", path.display())]
    Conflict { source_id: String, path: PathBuf },

    #[error("Download task for {source_id} stopped unexpectedly: {reason}")]
    TaskFailed { source_id: String, reason: String },

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    /// Wrap an IO error with the operation and path it concerns
    pub fn io(context: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveError::AlreadyImported { .. } => "already_imported",
            ArchiveError::DownloadFailed { .. } => "download_failed",
            ArchiveError::AmbiguousOutput { .. } => "ambiguous_output",
            ArchiveError::Conflict { .. } => "conflict",
            ArchiveError::TaskFailed { .. } => "task_failed",
            ArchiveError::Io { .. } => "io",
        }
    }
}
