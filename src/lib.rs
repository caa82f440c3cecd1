//! podshelf - Deduplicated audiobook archive with an RSS feed
//!
//! Books are downloaded by an external tool, stored once under the SHA256 of
//! the identifier they came from, and exposed through a catalog directory of
//! relative symlinks that an RSS feed is generated from.
//!
//! # Architecture
//!
//! - Downloads for a batch run concurrently, one task and one scratch
//!   workspace per identifier, and report back in completion order
//! - The content store never stores an identifier twice and never
//!   overwrites a file
//! - Broken catalog links are repaired against the store by file name
//!
//! # Modules
//!
//! - `adapters`: Downloader backends (youtube-dl subprocess)
//! - `core`: Batch orchestration
//! - `domain`: Errors and task outcomes
//! - `library`: Content store, catalog, import
//! - `feed`: RSS generation
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! podshelf init https://example.com/audiobooks
//! podshelf get --rss feed.xml https://youtube.com/watch?v=abc
//! podshelf fix
//! podshelf rss feed.xml
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod feed;
pub mod library;

// Re-export main types at crate root for convenience
pub use adapters::{Downloader, SubprocessDownloader};
pub use config::{ArchiveConfig, ArchivePaths};
pub use crate::core::Orchestrator;
pub use domain::{ArchiveError, DownloadTask};
pub use library::{Archive, Catalog, CatalogEntry, ContentKey, ContentStore, RepairReport, StoreEntry};
