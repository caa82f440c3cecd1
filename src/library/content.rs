//! Content-addressed store for downloaded books.
//!
//! Every book lives in exactly one file named after the SHA256 of the
//! identifier it was downloaded from. The store never overwrites a file.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::ArchiveError;

/// Content key (hex SHA256 of the source identifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// Create a content key from a source identifier
    pub fn from_source(source_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source_id.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed file in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub key: ContentKey,
    pub path: PathBuf,
}

impl StoreEntry {
    /// File name of the entry inside the store directory
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Deduplicated backing storage keyed by [`ContentKey`]
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
    extension: String,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extension of every file in the store (without the dot)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path the book for `source_id` is (or would be) stored at. No IO.
    pub fn resolve(&self, source_id: &str) -> PathBuf {
        let key = ContentKey::from_source(source_id);
        self.dir.join(format!("{}.{}", key, self.extension))
    }

    /// Whether a regular file is stored for `source_id`.
    ///
    /// Links are followed, so a link to a missing target does not count.
    pub async fn exists(&self, source_id: &str) -> bool {
        is_file(&self.resolve(source_id)).await
    }

    /// Move a finished download into the store.
    ///
    /// The move is a hard link to the final name followed by unlinking the
    /// temporary name, so an existing entry is never replaced: the loser of a
    /// race gets [`ArchiveError::Conflict`] and its file is left untouched.
    pub async fn commit(&self, temp_file: &Path, source_id: &str) -> Result<StoreEntry, ArchiveError> {
        let path = self.resolve(source_id);

        match fs::hard_link(temp_file, &path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(ArchiveError::Conflict {
                    source_id: source_id.to_string(),
                    path,
                });
            }
            Err(e) => {
                return Err(ArchiveError::io(
                    format!("Failed to move {} into the store", temp_file.display()),
                    path,
                    e,
                ));
            }
        }

        // The workspace is removed anyway; a leftover name there is harmless.
        if let Err(e) = fs::remove_file(temp_file).await {
            warn!(file = %temp_file.display(), error = %e, "Failed to remove committed temp file");
        }

        debug!(%source_id, path = %path.display(), "Committed store entry");

        Ok(StoreEntry {
            key: ContentKey::from_source(source_id),
            path,
        })
    }
}

/// Whether `path`, after following links, is a regular file
pub(crate) async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
