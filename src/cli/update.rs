//! Bring the installation up to date with its channel.
//!
//! ```bash
//! mudsync update                # differential update of the configured channel
//! mudsync update --channel dev  # one-off update from the dev channel
//! mudsync update --full         # refetch everything through the archive
//! ```
//!
//! The changelog is printed on success. Quarantine failures are reported as
//! warnings and do not change the exit status.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::config::Channel;
use crate::updater::UpdateOutcome;

#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Channel to update from for this run only.
    #[arg(long, value_enum)]
    channel: Option<Channel>,

    /// Reinstall every file instead of applying a difference.
    #[arg(long)]
    full: bool,
}

impl CommandExecutor for UpdateCommand {
    async fn execute_with(self, mut ctx: CommandContext) -> Result<()> {
        if let Some(channel) = self.channel {
            ctx.config.channel = channel;
        }
        ctx.config.full_install = self.full;
        run_update(&ctx).await
    }
}

/// Runs an update with the context's configuration and prints the outcome.
pub(crate) async fn run_update(ctx: &CommandContext) -> Result<()> {
    ctx.say(format!(
        "{} {} ({})",
        "Updating".cyan().bold(),
        ctx.config.install_dir.display(),
        ctx.config.git_ref()
    ));

    let outcome = ctx.updater()?.update().await?;
    print_outcome(ctx, &outcome);
    Ok(())
}

fn print_outcome(ctx: &CommandContext, outcome: &UpdateOutcome) {
    ctx.say(outcome.changelog.render_colored().trim_end());

    let Some(report) = &outcome.report else {
        return;
    };
    if let Some(mode) = &report.mode {
        ctx.say(format!("{} {} files via {}", "Applied".green().bold(), report.fetched.len(), mode));
    }
    for (path, reason) in &report.quarantine_failures {
        eprintln!("{} could not move {} to .old: {}", "warning:".yellow().bold(), path, reason);
    }
}
