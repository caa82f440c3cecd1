//! Concurrent batch downloads.
//!
//! Every requested identifier gets its own task and its own workspace.
//! Results are delivered over a channel in the order the tasks finish.
//!
//! There is no concurrency cap and no timeout: a hung downloader keeps its
//! task, and therefore the batch, open.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::Downloader;
use crate::domain::{ArchiveError, DownloadTask};
use crate::library::{Archive, CatalogEntry};

/// Identifiers currently being downloaded by this process
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Batch download orchestrator
pub struct Orchestrator {
    archive: Arc<Archive>,
    downloader: Arc<dyn Downloader>,
    in_flight: InFlight,
}

impl Orchestrator {
    /// Create an orchestrator feeding `archive` from `downloader`
    pub fn new(archive: Arc<Archive>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            archive,
            downloader,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Start one task per identifier and return the stream of their results.
    ///
    /// The receiver yields exactly one [`DownloadTask`] per identifier, in
    /// completion order, and reports `None` once all of them have finished.
    /// A failing item never affects the others, and a task that panics is
    /// reported as `TaskFailed`. Duplicate identifiers in one batch are not
    /// merged: all but one fail with `Conflict` or `AlreadyImported`.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self, source_ids), fields(downloader = %self.downloader.name()))]
    pub fn run_batch(&self, source_ids: Vec<String>) -> mpsc::Receiver<DownloadTask> {
        let (tx, rx) = mpsc::channel(source_ids.len().max(1));

        info!(count = source_ids.len(), "Starting batch");

        for source_id in source_ids {
            let tx = tx.clone();
            let archive = Arc::clone(&self.archive);
            let downloader = Arc::clone(&self.downloader);
            let in_flight = Arc::clone(&self.in_flight);

            tokio::spawn(async move {
                let worker = {
                    let source_id = source_id.clone();
                    tokio::spawn(async move {
                        download_one(&archive, downloader.as_ref(), &in_flight, &source_id).await
                    })
                };

                // A panicking downloader still reports an outcome for its identifier
                let outcome = match worker.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(ArchiveError::TaskFailed {
                        source_id: source_id.clone(),
                        reason: e.to_string(),
                    }),
                };

                if let Err(e) = &outcome {
                    warn!(%source_id, error = %e, "Download failed");
                }

                // The consumer may have stopped listening; the work is done either way.
                let _ = tx.send(DownloadTask::new(source_id, outcome)).await;
            });
        }

        // The channel closes when the last task drops its sender.
        rx
    }

    /// Run a batch and wait for every result
    pub async fn run_batch_to_end(&self, source_ids: Vec<String>) -> Vec<DownloadTask> {
        let mut rx = self.run_batch(source_ids);
        let mut tasks = Vec::new();

        while let Some(task) = rx.recv().await {
            tasks.push(task);
        }

        tasks
    }
}

/// Download and import a single identifier
async fn download_one(
    archive: &Archive,
    downloader: &dyn Downloader,
    in_flight: &InFlight,
    source_id: &str,
) -> Result<CatalogEntry, ArchiveError> {
    let _claim = InFlightClaim::acquire(in_flight, source_id).ok_or_else(|| ArchiveError::Conflict {
        source_id: source_id.to_string(),
        path: archive.store().resolve(source_id),
    })?;

    if archive.store().exists(source_id).await {
        return Err(ArchiveError::AlreadyImported {
            source_id: source_id.to_string(),
            path: archive.store().resolve(source_id),
        });
    }

    info!(%source_id, "Downloading");

    let workspace = archive.create_workspace()?;
    debug!(%source_id, workspace = %workspace.path().display(), "Created workspace");

    let result = match downloader.download(source_id, workspace.path()).await {
        Ok(file) => archive.import(&file, source_id).await,
        Err(e) => Err(e),
    };

    let workspace_path = workspace.path().to_path_buf();
    if let Err(e) = workspace.close() {
        warn!(workspace = %workspace_path.display(), error = %e, "Failed to remove workspace");
    }

    result
}

/// Marks an identifier as in flight until dropped
struct InFlightClaim<'a> {
    in_flight: &'a InFlight,
    source_id: String,
}

impl<'a> InFlightClaim<'a> {
    fn acquire(in_flight: &'a InFlight, source_id: &str) -> Option<Self> {
        let mut set = in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if !set.insert(source_id.to_string()) {
            return None;
        }

        Some(Self {
            in_flight,
            source_id: source_id.to_string(),
        })
    }
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.source_id);
    }
}
