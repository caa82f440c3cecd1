//! Downloader interfaces for external sources.
//!
//! A downloader turns a source identifier into exactly one audio file inside
//! a workspace directory it is handed. The orchestrator and the import
//! pipeline only see the [`Downloader`] trait.

pub mod subprocess;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::Pattern;
use tokio::fs;

use crate::domain::ArchiveError;

pub use subprocess::SubprocessDownloader;

/// Trait for download backends
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Human-readable downloader name
    fn name(&self) -> &str;

    /// Download `source_id` into `workspace`.
    ///
    /// On success exactly one output file exists in `workspace` and its path
    /// is returned. The caller owns and removes the workspace.
    async fn download(&self, source_id: &str, workspace: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Return the only regular file in `dir` whose name matches `pattern`.
///
/// Zero or several matches are [`ArchiveError::AmbiguousOutput`].
pub async fn find_single_output(dir: &Path, pattern: &Pattern) -> Result<PathBuf, ArchiveError> {
    let mut matches = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| ArchiveError::io("Failed to list workspace", dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ArchiveError::io("Failed to list workspace", dir, e))?
    {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        let name_matches = entry
            .file_name()
            .to_str()
            .map(|name| pattern.matches(name))
            .unwrap_or(false);

        if is_file && name_matches {
            matches.push(entry.path());
        }
    }

    if matches.len() != 1 {
        return Err(ArchiveError::AmbiguousOutput {
            dir: dir.to_path_buf(),
            pattern: pattern.as_str().to_string(),
            found: matches.len(),
        });
    }

    Ok(matches.remove(0))
}
