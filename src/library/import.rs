//! Import of finished downloads into the store and catalog.

use std::path::Path;

use tracing::{info, warn};

use super::catalog::{Catalog, CatalogEntry};
use super::content::ContentStore;
use crate::domain::ArchiveError;

/// Commit `file` to the store under `source_id` and link it into the catalog
/// under its own file name.
///
/// Nothing is touched if the book is already stored. If the commit fails the
/// file stays where it is. If linking fails after the commit the store entry
/// is kept without a catalog link; it still counts as downloaded.
pub async fn import_file(
    store: &ContentStore,
    catalog: &Catalog,
    file: &Path,
    source_id: &str,
) -> Result<CatalogEntry, ArchiveError> {
    let store_path = store.resolve(source_id);
    if store.exists(source_id).await {
        return Err(ArchiveError::AlreadyImported {
            source_id: source_id.to_string(),
            path: store_path,
        });
    }

    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ArchiveError::io(
                "Downloaded file has no usable name",
                file,
                std::io::Error::from(std::io::ErrorKind::InvalidInput),
            )
        })?
        .to_string();

    let stored = store.commit(file, source_id).await?;

    match catalog.link(&stored, &name).await {
        Ok(entry) => {
            info!(%source_id, book = %entry.path.display(), "Imported book");
            Ok(entry)
        }
        Err(e) => {
            warn!(
                %source_id,
                store_entry = %stored.path.display(),
                error = %e,
                "Stored book has no catalog link"
            );
            Err(e)
        }
    }
}
