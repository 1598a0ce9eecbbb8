//! Command-line interface for mudsync.
//!
//! Each subcommand lives in its own module with its own argument struct and
//! implements [`CommandExecutor`](common::CommandExecutor). Global flags are
//! collected into [`GlobalOptions`](common::GlobalOptions), which loads the
//! configuration once and hands every command a ready
//! [`CommandContext`](common::CommandContext).
//!
//! # Available Commands
//!
//! - `update` - Bring the installation up to date with its channel
//! - `check` - Show what an update would change
//! - `status` - Summarize tracked, missing, untracked and quarantined files
//! - `channel` - Switch between the stable and dev channels
//! - `self-check` - Look for a newer updater build
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - Log level (debug / warnings only)
//! - `--dir` - Installation directory (defaults to the working directory)
//! - `--config` - Configuration file (defaults to `<dir>/mudsync.toml`)
//! - `--no-progress` - Disable progress bars
//!
//! # Example
//!
//! ```bash
//! mudsync --dir ~/mudclient check
//! mudsync --dir ~/mudclient update
//! mudsync channel dev --no-update
//! ```

mod channel;
mod check;
pub mod common;
mod self_check;
mod status;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use common::{CommandExecutor, GlobalOptions};

pub use status::InstallStatus;

/// Main CLI structure for mudsync.
#[derive(Parser, Debug)]
#[command(
    name = "mudsync",
    about = "Keep a MUD client installation in sync with its distribution",
    version,
    long_about = "mudsync compares the installed files with the published distribution, downloads what changed, and moves files removed upstream into .old/."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Installation directory
    #[arg(long, global = true, env = "MUDSYNC_DIR")]
    dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, env = "MUDSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update the installation
    Update(update::UpdateCommand),

    /// Show pending changes without applying them
    Check(check::CheckCommand),

    /// Show installation status
    Status(status::StatusCommand),

    /// Switch release channel
    Channel(channel::ChannelCommand),

    /// Check for a newer updater build
    SelfCheck(self_check::SelfCheckCommand),
}

impl Cli {
    /// Default log filter for the verbosity flags; `RUST_LOG` takes precedence.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "mudsync=debug"
        } else if self.quiet {
            "warn"
        } else {
            "mudsync=info"
        }
    }

    #[must_use]
    pub fn global_options(&self) -> GlobalOptions {
        GlobalOptions {
            dir: self.dir.clone(),
            config: self.config.clone(),
            no_progress: self.no_progress,
            quiet: self.quiet,
        }
    }

    pub async fn execute(self) -> Result<()> {
        let ctx = self.global_options().load_context().await?;

        match self.command {
            Commands::Update(cmd) => cmd.execute_with(ctx).await,
            Commands::Check(cmd) => cmd.execute_with(ctx).await,
            Commands::Status(cmd) => cmd.execute_with(ctx).await,
            Commands::Channel(cmd) => cmd.execute_with(ctx).await,
            Commands::SelfCheck(cmd) => cmd.execute_with(ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["mudsync", "update", "--full", "--dir", "/tmp/x", "-v"]);
        assert_eq!(cli.log_filter(), "mudsync=debug");
        let options = cli.global_options();
        assert_eq!(options.dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Update(_)));
    }

    #[test]
    fn test_channel_requires_known_value() {
        assert!(Cli::try_parse_from(["mudsync", "channel", "beta"]).is_err());
        let cli = Cli::parse_from(["mudsync", "channel", "dev", "--no-update", "-q"]);
        assert_eq!(cli.log_filter(), "warn");
        assert!(cli.global_options().quiet);
    }
}
