//! Command-line interface for podshelf.
//!
//! Provides commands for creating an archive, downloading books into it,
//! repairing the catalog and writing the RSS feed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{Downloader, SubprocessDownloader};
use crate::config::{self, ArchiveConfig};
use crate::core::Orchestrator;
use crate::feed;
use crate::library::Archive;

/// podshelf - Deduplicated audiobook archive with an RSS feed
#[derive(Parser, Debug)]
#[command(name = "podshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Archive root (defaults to the nearest initialised parent directory)
    #[arg(long, global = true, env = config::HOME_ENV)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an archive in the current directory
    Init {
        /// Base URL the archive is served under
        url: String,
    },

    /// Download books into the archive
    Get {
        /// Rewrite this feed file after every finished book
        #[arg(long)]
        rss: Option<PathBuf>,

        /// Source identifiers (URLs) to download
        #[arg(required = true)]
        source_ids: Vec<String>,
    },

    /// Repair broken catalog links
    Fix,

    /// Write the RSS feed
    Rss {
        /// Output file
        output: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Init { url } => {
                let root = match self.root {
                    Some(root) => root,
                    None => std::env::current_dir().context("Failed to determine current directory")?,
                };
                init_archive(root, url)
            }
            Commands::Get { rss, source_ids } => {
                let archive = open_archive(self.root)?;
                get_books(archive, source_ids, rss).await
            }
            Commands::Fix => {
                let archive = open_archive(self.root)?;
                fix_links(&archive).await
            }
            Commands::Rss { output } => {
                let archive = open_archive(self.root)?;
                feed::write_rss(&archive, &output).await
            }
            Commands::Config => {
                let archive = open_archive(self.root)?;
                show_config(&archive)
            }
        }
    }
}

fn open_archive(root: Option<PathBuf>) -> Result<Archive> {
    let root = match root {
        Some(root) => root,
        None => config::resolve_archive_root()?,
    };
    Archive::open(&root)
}

/// Create (or re-configure) an archive
fn init_archive(root: PathBuf, url: String) -> Result<()> {
    let archive = Archive::init(&root, ArchiveConfig::new(url))?;
    println!("Initialized archive in {}", archive.paths().root.display());
    Ok(())
}

/// Download a batch of books, reporting each as it finishes
async fn get_books(archive: Archive, source_ids: Vec<String>, rss: Option<PathBuf>) -> Result<()> {
    let downloader: Arc<dyn Downloader> =
        Arc::new(SubprocessDownloader::from_config(&archive.config().downloader)?);
    let orchestrator = Orchestrator::new(Arc::new(archive), downloader);

    let mut results = orchestrator.run_batch(source_ids);
    let (mut succeeded, mut failed) = (0usize, 0usize);

    while let Some(task) = results.recv().await {
        match &task.outcome {
            Ok(entry) => {
                succeeded += 1;
                println!("Finished {}: {}", task.source_id, entry.path.display());

                if let Some(path) = &rss {
                    println!("Writing {}", path.display());
                    feed::write_rss(orchestrator.archive(), path).await?;
                }
            }
            Err(e) => {
                failed += 1;
                println!("Finished {}: [{}] {}", task.source_id, e.kind(), e);
            }
        }
    }

    println!("{} downloaded, {} failed", succeeded, failed);
    Ok(())
}

/// Repair broken catalog links
async fn fix_links(archive: &Archive) -> Result<()> {
    let report = archive
        .catalog()
        .scan_and_repair()
        .await
        .context("Failed to fix catalog links")?;

    for link in &report.repaired {
        println!("Repaired {}", link.display());
    }
    for link in &report.unrepairable {
        println!("Removed {} (store file missing)", link.display());
    }
    println!(
        "Checked {} links: {} repaired, {} removed",
        report.checked,
        report.repaired.len(),
        report.unrepairable.len()
    );

    Ok(())
}

/// Show the resolved configuration
fn show_config(archive: &Archive) -> Result<()> {
    let paths = archive.paths();
    let config = archive.config();

    println!("Root:        {}", paths.root.display());
    println!("Catalog:     {}", archive.catalog().dir().display());
    println!("Store:       {}", archive.store().dir().display());
    println!("Workspaces:  {}", paths.temp.display());
    println!("Config file: {}", paths.config_file.display());
    println!();
    println!("URL:         {}", config.url);
    println!("Feed title:  {}", config.feed.title);
    println!(
        "Downloader:  {} {}",
        config.downloader.program,
        config.downloader.resolved_args().join(" ")
    );

    Ok(())
}
