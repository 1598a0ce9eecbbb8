//! Shared plumbing for CLI commands.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::{CatalogEntry, GitHubCatalog, LocalCatalog, RemoteCatalog};
use crate::config::{SourceConfig, UpdaterConfig};
use crate::core::Result as UpdateResult;
use crate::transport::HttpTransport;
use crate::updater::Updater;
use crate::utils::progress::{ProgressSink, TerminalProgress};

/// Common trait for CLI command execution pattern
pub trait CommandExecutor: Sized {
    /// Execute the command against a loaded context.
    fn execute_with(self, ctx: CommandContext) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Installation directory; defaults to the working directory.
    pub dir: Option<PathBuf>,
    /// Configuration file; defaults to `<dir>/mudsync.toml`.
    pub config: Option<PathBuf>,
    pub no_progress: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    /// Resolves paths and loads the configuration they point at.
    pub async fn load_context(&self) -> Result<CommandContext> {
        let install_dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine the working directory")?,
        };
        let config_path = self.config.clone().unwrap_or_else(|| UpdaterConfig::default_path(&install_dir));

        let mut config = UpdaterConfig::load_from(&config_path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
        config.install_dir = install_dir;
        config.show_progress = !self.no_progress && !self.quiet;

        Ok(CommandContext {
            config,
            config_path,
            quiet: self.quiet,
        })
    }
}

/// Loaded configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: UpdaterConfig,
    /// File the configuration was read from (it may not exist yet).
    pub config_path: PathBuf,
    pub quiet: bool,
}

impl CommandContext {
    /// Builds an update session for the configured source.
    pub fn updater(&self) -> Result<Updater<SourceCatalog, HttpTransport>> {
        let catalog = SourceCatalog::from_config(&self.config)?;
        let transport = HttpTransport::with_options(self.config.transport_options())?;
        let progress: Arc<dyn ProgressSink> = Arc::new(TerminalProgress::new(self.config.show_progress));
        Ok(Updater::new(self.config.clone(), catalog, transport, progress))
    }

    /// Prints to stdout unless `--quiet` was given.
    pub fn say(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", message.as_ref());
        }
    }
}

/// The catalog selected by `[source]`.
pub enum SourceCatalog {
    GitHub(GitHubCatalog),
    Local(LocalCatalog),
}

impl SourceCatalog {
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        match &config.source {
            SourceConfig::Github {
                owner,
                repo,
                api_base,
                raw_base,
                archive_base,
            } => {
                let catalog = GitHubCatalog::with_bases(
                    owner.as_str(),
                    repo.as_str(),
                    api_base.as_str(),
                    raw_base.as_str(),
                    archive_base.as_str(),
                    config.transport_options().request_timeout,
                )?;
                Ok(Self::GitHub(catalog))
            }
            SourceConfig::Local {
                ..
            } => {
                let path = config.local_source_path()?.context("Local source without a path")?;
                Ok(Self::Local(LocalCatalog::new(path)))
            }
        }
    }
}

impl RemoteCatalog for SourceCatalog {
    async fn get_tree(&self, git_ref: &str) -> UpdateResult<Vec<CatalogEntry>> {
        match self {
            Self::GitHub(catalog) => catalog.get_tree(git_ref).await,
            Self::Local(catalog) => catalog.get_tree(git_ref).await,
        }
    }

    fn raw_url(&self, git_ref: &str, path: &str) -> String {
        match self {
            Self::GitHub(catalog) => catalog.raw_url(git_ref, path),
            Self::Local(catalog) => catalog.raw_url(git_ref, path),
        }
    }

    fn archive_url(&self, git_ref: &str) -> Option<String> {
        match self {
            Self::GitHub(catalog) => catalog.archive_url(git_ref),
            Self::Local(catalog) => catalog.archive_url(git_ref),
        }
    }
}
