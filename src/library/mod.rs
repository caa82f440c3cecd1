//! Deduplicated storage for downloaded books.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/
//! ├── books/                      # Catalog
//! │   └── <download name>.mp3     # -> ../.archive/db/<sha256>.mp3
//! └── .archive/
//!     ├── config.txt
//!     ├── db/<sha256(source)>.mp3 # Content store
//!     └── temp/book*/             # One workspace per running download
//! ```

pub mod catalog;
pub mod content;
pub mod import;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::info;

use crate::config::{ArchiveConfig, ArchivePaths};
use crate::domain::ArchiveError;

pub use catalog::{Catalog, CatalogEntry, RepairReport};
pub use content::{ContentKey, ContentStore, StoreEntry};
pub use import::import_file;

/// An opened archive: layout, configuration, store and catalog.
///
/// Built once at startup and shared (behind an `Arc`) with every task.
#[derive(Debug, Clone)]
pub struct Archive {
    paths: ArchivePaths,
    config: ArchiveConfig,
    store: ContentStore,
    catalog: Catalog,
}

impl Archive {
    /// Assemble an archive from already resolved parts. No IO.
    pub fn new(paths: ArchivePaths, config: ArchiveConfig) -> Self {
        let store = ContentStore::new(&paths.store, config.downloader.audio_format.clone());
        let catalog = Catalog::new(&paths.catalog, &paths.store);

        Self {
            paths,
            config,
            store,
            catalog,
        }
    }

    /// Create the directory layout and write the config under `root`.
    ///
    /// Re-running on an existing archive only rewrites the config.
    pub fn init(root: &Path, config: ArchiveConfig) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create archive root: {}", root.display()))?;
        let paths = ArchivePaths::new(absolute_root(root)?);

        ensure_dirs(&paths)?;
        config.save(&paths.config_file)?;

        info!(root = %paths.root.display(), url = %config.url, "Initialized archive");

        Ok(Self::new(paths, config))
    }

    /// Open an archive previously created with [`Archive::init`]
    pub fn open(root: &Path) -> Result<Self> {
        let paths = ArchivePaths::new(absolute_root(root)?);

        if !paths.is_initialized() {
            anyhow::bail!(
                "No archive found at {}. Did you run `podshelf init <url>`?",
                paths.root.display()
            );
        }

        let config = ArchiveConfig::load(&paths.config_file)?;
        ensure_dirs(&paths)?;

        Ok(Self::new(paths, config))
    }

    pub fn paths(&self) -> &ArchivePaths {
        &self.paths
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Create a fresh workspace for one download.
    ///
    /// The directory is removed when the returned guard is dropped.
    pub fn create_workspace(&self) -> Result<TempDir, ArchiveError> {
        tempfile::Builder::new()
            .prefix("book")
            .tempdir_in(&self.paths.temp)
            .map_err(|e| ArchiveError::io("Failed to create workspace", &self.paths.temp, e))
    }

    /// Import a finished download, see [`import_file`]
    pub async fn import(&self, file: &Path, source_id: &str) -> Result<CatalogEntry, ArchiveError> {
        import_file(&self.store, &self.catalog, file, source_id).await
    }
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Failed to resolve archive root: {}", root.display()))
}

fn ensure_dirs(paths: &ArchivePaths) -> Result<()> {
    for dir in paths.required_dirs() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_open() {
        let temp = tempfile::tempdir().unwrap();

        let created = Archive::init(temp.path(), ArchiveConfig::new("https://example.com")).unwrap();
        for dir in created.paths().required_dirs() {
            assert!(dir.is_dir(), "{} should exist", dir.display());
        }

        let opened = Archive::open(temp.path()).unwrap();
        assert_eq!(opened.config().url, "https://example.com");
        assert_eq!(opened.paths(), created.paths());
        assert_eq!(opened.store().extension(), "mp3");
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let temp = tempfile::tempdir().unwrap();
        let err = Archive::open(temp.path()).unwrap_err();
        assert!(err.to_string().contains("init"));
    }

    #[test]
    fn test_workspaces_are_distinct_and_removed_on_drop() {
        let temp = tempfile::tempdir().unwrap();
        let archive = Archive::init(temp.path(), ArchiveConfig::new("https://x")).unwrap();

        let a = archive.create_workspace().unwrap();
        let b = archive.create_workspace().unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(&archive.paths().temp));

        let path = a.path().to_path_buf();
        drop(a);
        assert!(!path.exists());
    }
}
