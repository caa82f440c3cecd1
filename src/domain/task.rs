//! Outcome of a single download within a batch.

use crate::library::CatalogEntry;

use super::error::ArchiveError;

/// Result for one requested source identifier, delivered in completion order
#[derive(Debug)]
pub struct DownloadTask {
    /// The identifier that was requested
    pub source_id: String,

    /// Catalog entry on success, the per-item error otherwise
    pub outcome: Result<CatalogEntry, ArchiveError>,
}

impl DownloadTask {
    pub fn new(source_id: impl Into<String>, outcome: Result<CatalogEntry, ArchiveError>) -> Self {
        Self {
            source_id: source_id.into(),
            outcome,
        }
    }

    /// Whether the book was downloaded and imported
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
