//! Configuration for the updater.
//!
//! Everything that changes behavior lives in one explicit [`UpdaterConfig`]
//! value that is threaded through constructors. It is read from
//! `mudsync.toml` in the installation root (or a path given with `--config`),
//! and command-line flags are applied on top of it.
//!
//! A missing file yields the defaults; a malformed file is an error.
//!
//! # File Format
//!
//! ```toml
//! channel = "stable"
//! max_parallel = 6
//! bulk_threshold = 100
//! request_timeout_secs = 30
//! archive_timeout_secs = 600
//! retry_attempts = 3
//!
//! [channels]
//! stable = "main"
//! dev = "dev"
//!
//! # Either a GitHub-style repository...
//! [source]
//! kind = "github"
//! owner = "mudclient"
//! repo = "distribution"
//!
//! # ...or a mirror directory (`~` and `$VARS` are expanded, relative paths
//! # are resolved against the installation root)
//! # [source]
//! # kind = "local"
//! # path = "~/mirrors/distribution"
//!
//! [self_update]
//! descriptor_url = "https://example.invalid/mudsync/version.json"
//! ```

use crate::applier::ApplyOptions;
use crate::catalog::github::{DEFAULT_API_BASE, DEFAULT_ARCHIVE_BASE, DEFAULT_RAW_BASE};
use crate::constants::{
    CONFIG_FILE, DEFAULT_ARCHIVE_TIMEOUT, DEFAULT_BULK_THRESHOLD, DEFAULT_MAX_PARALLEL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_ATTEMPTS,
};
use crate::core::{Result, UpdateError};
use crate::transport::TransportOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Release channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Dev,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

impl FromStr for Channel {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Ok(Self::Stable),
            "dev" => Ok(Self::Dev),
            other => Err(UpdateError::Config {
                message: format!("unknown channel '{other}' (expected 'stable' or 'dev')"),
            }),
        }
    }
}

/// Repository ref each channel tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRefs {
    #[serde(default = "default_stable_ref")]
    pub stable: String,
    #[serde(default = "default_dev_ref")]
    pub dev: String,
}

fn default_stable_ref() -> String {
    "main".to_string()
}

fn default_dev_ref() -> String {
    "dev".to_string()
}

impl Default for ChannelRefs {
    fn default() -> Self {
        Self {
            stable: default_stable_ref(),
            dev: default_dev_ref(),
        }
    }
}

impl ChannelRefs {
    #[must_use]
    pub fn ref_for(&self, channel: Channel) -> &str {
        match channel {
            Channel::Stable => &self.stable,
            Channel::Dev => &self.dev,
        }
    }
}

/// Where the distributed files come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A repository behind a GitHub-compatible API.
    Github {
        owner: String,
        repo: String,
        #[serde(default = "default_api_base")]
        api_base: String,
        #[serde(default = "default_raw_base")]
        raw_base: String,
        #[serde(default = "default_archive_base")]
        archive_base: String,
    },
    /// A mirror directory.
    Local {
        path: String,
    },
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_raw_base() -> String {
    DEFAULT_RAW_BASE.to_string()
}

fn default_archive_base() -> String {
    DEFAULT_ARCHIVE_BASE.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Github {
            owner: "mudclient".to_string(),
            repo: "distribution".to_string(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            archive_base: default_archive_base(),
        }
    }
}

/// Self-update check settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfUpdateConfig {
    /// URL of the version descriptor. No URL disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_url: Option<String>,
}

const fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

const fn default_bulk_threshold() -> usize {
    DEFAULT_BULK_THRESHOLD
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

const fn default_archive_timeout_secs() -> u64 {
    DEFAULT_ARCHIVE_TIMEOUT.as_secs()
}

const fn default_retry_attempts() -> usize {
    DEFAULT_RETRY_ATTEMPTS
}

/// Complete updater configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Installation root. Not persisted; set by the caller.
    #[serde(skip)]
    pub install_dir: PathBuf,

    #[serde(default)]
    pub channel: Channel,

    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default = "default_bulk_threshold")]
    pub bulk_threshold: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_archive_timeout_secs")]
    pub archive_timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    #[serde(default)]
    pub channels: ChannelRefs,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub self_update: SelfUpdateConfig,

    /// Render progress bars. Runtime only.
    #[serde(skip)]
    pub show_progress: bool,

    /// Force a full archive install. Runtime only.
    #[serde(skip)]
    pub full_install: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("."),
            channel: Channel::default(),
            channels: ChannelRefs::default(),
            source: SourceConfig::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
            request_timeout_secs: default_request_timeout_secs(),
            archive_timeout_secs: default_archive_timeout_secs(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            self_update: SelfUpdateConfig::default(),
            show_progress: false,
            full_install: false,
        }
    }
}

impl UpdaterConfig {
    /// Default location of the configuration file for an installation.
    #[must_use]
    pub fn default_path(install_dir: &Path) -> PathBuf {
        install_dir.join(CONFIG_FILE)
    }

    /// Loads `<install_dir>/mudsync.toml`.
    pub async fn load(install_dir: &Path) -> Result<Self> {
        let mut config = Self::load_from(&Self::default_path(install_dir)).await?;
        config.install_dir = install_dir.to_path_buf();
        Ok(config)
    }

    /// Loads a configuration file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Config`] for invalid TOML or invalid values, and
    /// [`UpdateError::Io`] for read failures other than "not found".
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No configuration at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(UpdateError::io("Reading configuration", path, e)),
        };

        let config: Self = toml::from_str(&content).map_err(|e| UpdateError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| UpdateError::io("Creating directory", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| UpdateError::Config {
            message: format!("failed to serialize configuration: {e}"),
        })?;

        fs::write(path, content).await.map_err(|e| UpdateError::io("Writing configuration", path, e))
    }

    /// Sets `channel` in the file at `path`, keeping everything else as written.
    ///
    /// Comments and key order survive; a missing file is created with just
    /// the channel key.
    pub async fn persist_channel(path: &Path, channel: Channel) -> Result<()> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(UpdateError::io("Reading configuration", path, e)),
        };

        let mut doc: toml_edit::DocumentMut = content.parse().map_err(|e| UpdateError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        doc["channel"] = toml_edit::value(channel.to_string());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| UpdateError::io("Creating directory", parent, e))?;
        }
        fs::write(path, doc.to_string()).await.map_err(|e| UpdateError::io("Writing configuration", path, e))?;
        debug!("Persisted channel {} to {}", channel, path.display());
        Ok(())
    }

    /// Checks value ranges and required source fields.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| {
            Err(UpdateError::Config {
                message,
            })
        };

        if self.max_parallel == 0 {
            return invalid("max_parallel must be at least 1".to_string());
        }
        if self.retry_attempts == 0 {
            return invalid("retry_attempts must be at least 1".to_string());
        }
        if self.channels.stable.trim().is_empty() || self.channels.dev.trim().is_empty() {
            return invalid("channel refs must not be empty".to_string());
        }
        match &self.source {
            SourceConfig::Github {
                owner,
                repo,
                ..
            } if owner.trim().is_empty() || repo.trim().is_empty() => {
                invalid("source.owner and source.repo are required for a github source".to_string())
            }
            SourceConfig::Local {
                path,
            } if path.trim().is_empty() => invalid("source.path is required for a local source".to_string()),
            _ => Ok(()),
        }
    }

    /// Ref tracked by the active channel.
    #[must_use]
    pub fn git_ref(&self) -> &str {
        self.channels.ref_for(self.channel)
    }

    /// Mirror directory of a local source, with `~`/`$VAR` expanded and
    /// relative paths resolved against the installation root.
    pub fn local_source_path(&self) -> Result<Option<PathBuf>> {
        let SourceConfig::Local {
            path,
        } = &self.source
        else {
            return Ok(None);
        };

        let expanded = shellexpand::full(path).map_err(|e| UpdateError::Config {
            message: format!("cannot expand source path '{path}': {e}"),
        })?;
        let expanded = PathBuf::from(expanded.as_ref());
        Ok(Some(if expanded.is_absolute() {
            expanded
        } else {
            self.install_dir.join(expanded)
        }))
    }

    #[must_use]
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            archive_timeout: Duration::from_secs(self.archive_timeout_secs),
            retry_attempts: self.retry_attempts,
        }
    }

    #[must_use]
    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            max_parallel: self.max_parallel,
            bulk_threshold: self.bulk_threshold,
        }
    }
}
