//! Downloader that shells out to a youtube-dl compatible CLI.
//!
//! The program runs with the workspace as its working directory and the
//! source identifier as its last argument, and is expected to leave a single
//! `*.<audio_format>` file behind.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{find_single_output, Downloader};
use crate::config::DownloaderConfig;
use crate::domain::ArchiveError;

/// Downloader using subprocess mode
#[derive(Debug, Clone)]
pub struct SubprocessDownloader {
    /// Program to run
    program: String,

    /// Arguments placed before the source identifier
    args: Vec<String>,

    /// Pattern the produced file must match
    output_pattern: Pattern,
}

impl SubprocessDownloader {
    /// Create a downloader for `program`, keeping files with `extension`
    pub fn new(program: impl Into<String>, args: Vec<String>, extension: &str) -> Result<Self> {
        let output_pattern = Pattern::new(&format!("*.{}", extension))
            .with_context(|| format!("Invalid output extension '{}'", extension))?;

        Ok(Self {
            program: program.into(),
            args,
            output_pattern,
        })
    }

    /// Build from the `downloader` section of the archive config
    pub fn from_config(config: &DownloaderConfig) -> Result<Self> {
        Self::new(
            config.program.clone(),
            config.resolved_args(),
            &config.audio_format,
        )
    }

    async fn run(&self, source_id: &str, workspace: &Path) -> Result<(), ArchiveError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(source_id)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ArchiveError::DownloadFailed {
                source_id: source_id.to_string(),
                reason: format!("failed to spawn {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(ArchiveError::DownloadFailed {
                source_id: source_id.to_string(),
                reason: format!(
                    "{} exited with code {}: {}",
                    self.program,
                    exit_code,
                    stderr.trim()
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Downloader for SubprocessDownloader {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self, workspace), fields(program = %self.program))]
    async fn download(&self, source_id: &str, workspace: &Path) -> Result<PathBuf, ArchiveError> {
        self.run(source_id, workspace).await?;

        let file = find_single_output(workspace, &self.output_pattern).await?;
        debug!(file = %file.display(), "Download produced output");

        Ok(file)
    }
}
