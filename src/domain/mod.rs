//! Domain types shared across the archive.
//!
//! - ArchiveError: per-item error taxonomy
//! - DownloadTask: the outcome of one requested download

pub mod error;
pub mod task;

pub use error::ArchiveError;
pub use task::DownloadTask;
