//! Catalog of human-readable links into the content store.
//!
//! Catalog entries are relative symlinks, so the catalog and the store can be
//! moved together. When one of them moves on its own the links break and
//! [`Catalog::scan_and_repair`] points them back at the store by file name.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::content::{is_file, StoreEntry};
use crate::domain::ArchiveError;

/// A link in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path of the link itself
    pub path: PathBuf,

    /// Where the link resolves to (the link's directory joined with its target)
    pub target: PathBuf,
}

impl CatalogEntry {
    /// Display name of the entry (the link's file name)
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Changes made by a repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Links inspected
    pub checked: usize,

    /// Broken links that were re-pointed at the store
    pub repaired: Vec<PathBuf>,

    /// Broken links whose store file is gone too; these were removed
    pub unrepairable: Vec<PathBuf>,
}

impl RepairReport {
    /// True when the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.repaired.is_empty() && self.unrepairable.is_empty()
    }
}

/// Directory of links presenting store entries under readable names
#[derive(Debug, Clone)]
pub struct Catalog {
    dir: PathBuf,
    store_dir: PathBuf,
}

impl Catalog {
    pub fn new(dir: impl Into<PathBuf>, store_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            store_dir: store_dir.into(),
        }
    }

    /// Catalog directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Link `store_entry` into the catalog as `name`.
    ///
    /// Fails if `name` is already taken.
    pub async fn link(&self, store_entry: &StoreEntry, name: &str) -> Result<CatalogEntry, ArchiveError> {
        let link_path = self.dir.join(name);
        self.make_store_link(&link_path, Path::new(store_entry.file_name())).await
    }

    /// Create `link_path` pointing at `store_file_name` in the store, using a
    /// path relative to the link's own directory
    async fn make_store_link(
        &self,
        link_path: &Path,
        store_file_name: &Path,
    ) -> Result<CatalogEntry, ArchiveError> {
        let link_dir = link_path.parent().unwrap_or(&self.dir);
        let target = relative_path(link_dir, &self.store_dir).join(store_file_name);

        symlink(&target, link_path).await.map_err(|e| {
            ArchiveError::io(
                format!("Failed to link {} to {}", link_path.display(), target.display()),
                link_path,
                e,
            )
        })?;

        debug!(link = %link_path.display(), target = %target.display(), "Created catalog link");

        Ok(CatalogEntry {
            path: link_path.to_path_buf(),
            target: link_dir.join(target),
        })
    }

    /// Walk the catalog and fix every link that does not resolve to a file.
    ///
    /// A broken link is removed, then recreated against the store file with
    /// the same name as the broken target. If that store file does not exist
    /// either, the link stays removed and is reported as unrepairable.
    #[instrument(skip(self), fields(catalog = %self.dir.display()))]
    pub async fn scan_and_repair(&self) -> Result<RepairReport, ArchiveError> {
        let mut report = RepairReport::default();

        for link in self.walk_links().await? {
            report.checked += 1;

            let target = fs::read_link(&link)
                .await
                .map_err(|e| ArchiveError::io("Failed to read link", &link, e))?;
            let resolved = link.parent().unwrap_or(&self.dir).join(&target);

            if is_file(&resolved).await {
                continue;
            }

            warn!(link = %link.display(), target = %target.display(), "Link is broken");

            fs::remove_file(&link)
                .await
                .map_err(|e| ArchiveError::io("Failed to remove broken link", &link, e))?;

            let store_name = target.file_name().map(Path::new);
            let store_file_exists = match store_name {
                Some(name) => is_file(&self.store_dir.join(name)).await,
                None => false,
            };

            match store_name {
                Some(name) if store_file_exists => {
                    self.make_store_link(&link, name).await?;
                    info!(link = %link.display(), "Repaired link");
                    report.repaired.push(link);
                }
                _ => {
                    warn!(link = %link.display(), "Store file is missing, link removed");
                    report.unrepairable.push(link);
                }
            }
        }

        Ok(report)
    }

    /// Every catalog path that resolves to a regular file, sorted by path
    pub async fn entries(&self) -> Result<Vec<CatalogEntry>, ArchiveError> {
        let mut entries = Vec::new();

        for path in self.walk(false).await? {
            let target = match fs::read_link(&path).await {
                Ok(target) => path.parent().unwrap_or(&self.dir).join(target),
                Err(_) => path.clone(),
            };

            if is_file(&target).await {
                entries.push(CatalogEntry { path, target });
            }
        }

        Ok(entries)
    }

    async fn walk_links(&self) -> Result<Vec<PathBuf>, ArchiveError> {
        self.walk(true).await
    }

    /// Collect non-directory paths below the catalog, sorted. Symlinks are
    /// never descended into.
    async fn walk(&self, links_only: bool) -> Result<Vec<PathBuf>, ArchiveError> {
        let mut found = Vec::new();
        let mut stack = vec![self.dir.clone()];

        while let Some(current) = stack.pop() {
            let mut entries = fs::read_dir(&current)
                .await
                .map_err(|e| ArchiveError::io("Failed to read catalog directory", &current, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ArchiveError::io("Failed to read catalog directory", &current, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| ArchiveError::io("Failed to stat catalog entry", &path, e))?;

                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_symlink() || !links_only {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

/// Path leading from directory `from` to `to`, both given relative to the
/// same base (or both absolute)
pub(crate) fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let to: Vec<Component> = to
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    fs::symlink_file(target, link).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::content::ContentStore;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path_between_siblings() {
        assert_eq!(
            relative_path(Path::new("/a/books"), Path::new("/a/.archive/db")),
            PathBuf::from("../.archive/db")
        );
        assert_eq!(
            relative_path(Path::new("/a/books/series"), Path::new("/a/.archive/db")),
            PathBuf::from("../../.archive/db")
        );
        assert_eq!(
            relative_path(Path::new("./books"), Path::new(".archive/db")),
            PathBuf::from("../.archive/db")
        );
        assert_eq!(relative_path(Path::new("/a"), Path::new("/a")), PathBuf::new());
    }

    #[test]
    fn test_report_is_empty() {
        let mut report = RepairReport {
            checked: 3,
            ..Default::default()
        };
        assert!(report.is_empty());

        report.unrepairable.push(PathBuf::from("books/x.mp3"));
        assert!(!report.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_link_is_relative_and_resolves() {
        let temp = TempDir::new().unwrap();
        let store_dir = temp.path().join(".archive").join("db");
        let books = temp.path().join("books");
        fs::create_dir_all(&store_dir).await.unwrap();
        fs::create_dir_all(&books).await.unwrap();

        let store = ContentStore::new(&store_dir, "mp3");
        let download = temp.path().join("book1.mp3");
        fs::write(&download, b"audio").await.unwrap();
        let stored = store.commit(&download, "test").await.unwrap();

        let catalog = Catalog::new(&books, &store_dir);
        let entry = catalog.link(&stored, "book1.mp3").await.unwrap();

        assert_eq!(entry.name(), "book1.mp3");
        let raw = fs::read_link(&entry.path).await.unwrap();
        assert!(raw.is_relative());
        assert_eq!(raw, Path::new("../.archive/db").join(stored.file_name()));
        assert_eq!(fs::read(&entry.path).await.unwrap(), b"audio");

        let err = catalog.link(&stored, "book1.mp3").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_entries_skip_broken_links() {
        let temp = TempDir::new().unwrap();
        let books = temp.path().join("books");
        fs::create_dir_all(books.join("series")).await.unwrap();

        fs::write(books.join("plain.mp3"), b"a").await.unwrap();
        fs::write(temp.path().join("real.mp3"), b"b").await.unwrap();
        fs::symlink("../../real.mp3", books.join("series").join("linked.mp3"))
            .await
            .unwrap();
        fs::symlink("../gone.mp3", books.join("broken.mp3"))
            .await
            .unwrap();

        let catalog = Catalog::new(&books, temp.path());
        let names: Vec<String> = catalog
            .entries()
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();

        assert_eq!(names, vec!["plain.mp3", "linked.mp3"]);
    }
}
