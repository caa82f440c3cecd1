//! Configuration for an archive.
//!
//! Archive root resolution (highest priority first):
//! 1. Environment variable (PODSHELF_HOME)
//! 2. Nearest directory, from the current one upwards, containing
//!    `.archive/config.txt`
//! 3. The current directory
//!
//! The config file itself is YAML and only `url` is required:
//!
//! ```yaml
//! url: https://example.com/audiobooks
//! feed:
//!   title: Audiobooks
//! downloader:
//!   program: yt-dlp
//!   audio_format: mp3
//! ```

pub mod paths;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use paths::ArchivePaths;

/// Environment variable overriding archive root discovery
pub const HOME_ENV: &str = "PODSHELF_HOME";

/// Config file schema (matches YAML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL the catalog is served under
    pub url: String,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub downloader: DownloaderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Downloader binary
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the source identifier. When absent the
    /// youtube-dl audio extraction flags for `audio_format` are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Audio format, doubles as the store file extension
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
}

fn default_feed_title() -> String {
    "Audiobooks".to_string()
}
fn default_feed_description() -> String {
    "A list of Audiobooks".to_string()
}
fn default_program() -> String {
    "youtube-dl".to_string()
}
fn default_audio_format() -> String {
    "mp3".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
        }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: None,
            audio_format: default_audio_format(),
        }
    }
}

impl DownloaderConfig {
    /// Arguments to pass before the source identifier
    pub fn resolved_args(&self) -> Vec<String> {
        match &self.args {
            Some(args) => args.clone(),
            None => vec![
                "-x".to_string(),
                "--audio-format".to_string(),
                self.audio_format.clone(),
            ],
        }
    }
}

impl ArchiveConfig {
    /// Config with defaults for everything but the base URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            feed: FeedConfig::default(),
            downloader: DownloaderConfig::default(),
        }
    }

    /// Parse config from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write config to a file, replacing any previous one
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Reject values the rest of the archive cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!("Config 'url' must not be empty");
        }

        let format = &self.downloader.audio_format;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("Invalid audio format '{}'", format);
        }

        Ok(())
    }
}

/// Find the archive root by searching `start` and its parents
pub fn find_archive_root_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if ArchivePaths::new(&current).is_initialized() {
            return Some(current);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Resolve the archive root for the current process
pub fn resolve_archive_root() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Ok(find_archive_root_from(&cwd).unwrap_or(cwd))
}
