//! Canonical on-disk layout of an archive.
//!
//! Single source of truth - build an [`ArchivePaths`] once and pass it around
//! instead of joining directory names by hand.
//!
//! ```text
//! <root>/
//! ├── books/                 # Catalog: links named after downloaded files
//! └── .archive/
//!     ├── config.txt         # YAML configuration
//!     ├── db/                # Content store: <sha256>.<ext>
//!     └── temp/              # Per-download workspaces
//! ```

use std::path::{Path, PathBuf};

/// Hidden directory holding the store, workspaces and config
pub const ARCHIVE_DIR: &str = ".archive";

/// Catalog directory name (visible, relative to the root)
pub const CATALOG_DIR: &str = "books";

/// Store directory name (inside [`ARCHIVE_DIR`])
pub const STORE_DIR: &str = "db";

/// Workspace directory name (inside [`ARCHIVE_DIR`])
pub const TEMP_DIR: &str = "temp";

/// Config file name (inside [`ARCHIVE_DIR`])
pub const CONFIG_FILE: &str = "config.txt";

/// Resolved paths of a single archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePaths {
    /// Archive root (the working directory the archive was initialised in)
    pub root: PathBuf,

    /// Catalog directory (`<root>/books`)
    pub catalog: PathBuf,

    /// Content store directory (`<root>/.archive/db`)
    pub store: PathBuf,

    /// Workspace directory (`<root>/.archive/temp`)
    pub temp: PathBuf,

    /// Config file (`<root>/.archive/config.txt`)
    pub config_file: PathBuf,
}

impl ArchivePaths {
    /// Lay out the archive under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let hidden = root.join(ARCHIVE_DIR);

        Self {
            catalog: root.join(CATALOG_DIR),
            store: hidden.join(STORE_DIR),
            temp: hidden.join(TEMP_DIR),
            config_file: hidden.join(CONFIG_FILE),
            root,
        }
    }

    /// Directories that must exist for the archive to be usable
    pub fn required_dirs(&self) -> [&Path; 3] {
        [&self.temp, &self.catalog, &self.store]
    }

    /// Whether a config file is present under this root
    pub fn is_initialized(&self) -> bool {
        self.config_file.is_file()
    }
}
