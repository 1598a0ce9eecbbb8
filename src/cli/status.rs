//! Summarize the state of the installation.
//!
//! Reports the tracked, missing, untracked and quarantined file counts. No
//! network access is needed.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;
use walkdir::WalkDir;

use super::common::{CommandContext, CommandExecutor};
use crate::constants::QUARANTINE_DIR;
use crate::core::UpdateError;
use crate::manifest::{self, Manifest, is_builtin_excluded};
use crate::policy::{denormalize, normalize};

#[derive(Args, Debug)]
pub struct StatusCommand {}

/// File counts for one installation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InstallStatus {
    /// `false` when there is no manifest.
    pub installed: bool,
    pub tracked: usize,
    /// Tracked paths that are not on disk, sorted.
    pub missing: Vec<String>,
    pub untracked: usize,
    pub quarantined: usize,
}

impl InstallStatus {
    /// Compares the manifest with what is on disk under `root`.
    pub fn collect(root: &Path) -> crate::core::Result<Self> {
        let (local, installed) = match manifest::load_local(root) {
            Ok(local) => (local, true),
            Err(UpdateError::NotFound {
                ..
            }) => (Manifest::new(), false),
            Err(e) => return Err(e),
        };

        let missing =
            local.paths().filter(|path| !root.join(denormalize(path)).is_file()).cloned().collect();

        let mut untracked = 0;
        for entry in WalkDir::new(root).min_depth(1).into_iter().filter_map(|entry| entry.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = normalize(&relative.to_string_lossy());
            if !local.contains(&relative) && !is_builtin_excluded(&relative) {
                untracked += 1;
            }
        }

        let quarantined = WalkDir::new(root.join(QUARANTINE_DIR))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .count();

        Ok(Self {
            installed,
            tracked: local.len(),
            missing,
            untracked,
            quarantined,
        })
    }
}

impl CommandExecutor for StatusCommand {
    async fn execute_with(self, ctx: CommandContext) -> Result<()> {
        let root = &ctx.config.install_dir;
        let status = InstallStatus::collect(root)?;

        println!("{:<14}{}", "Install dir:".bold(), root.display());
        println!("{:<14}{} ({})", "Channel:".bold(), ctx.config.channel, ctx.config.git_ref());
        if !status.installed {
            println!("{}", "No manifest found; run `mudsync update` to install".yellow());
            return Ok(());
        }

        println!("{:<14}{}", "Tracked:".bold(), status.tracked);
        println!("{:<14}{}", "Missing:".bold(), status.missing.len());
        for path in &status.missing {
            println!("  {} {}", "!".red(), path);
        }
        println!("{:<14}{}", "Untracked:".bold(), status.untracked);
        println!("{:<14}{}", "Quarantined:".bold(), status.quarantined);
        Ok(())
    }
}
