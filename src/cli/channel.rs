//! Switch the installation to another release channel.
//!
//! The choice is written to the configuration file and, unless
//! `--no-update` is given, an update from the new channel runs immediately.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use super::update::run_update;
use crate::config::{Channel, UpdaterConfig};

#[derive(Args, Debug)]
pub struct ChannelCommand {
    /// Channel to switch to.
    #[arg(value_enum)]
    channel: Channel,

    /// Only record the channel; do not update.
    #[arg(long)]
    no_update: bool,
}

impl CommandExecutor for ChannelCommand {
    async fn execute_with(self, mut ctx: CommandContext) -> Result<()> {
        UpdaterConfig::persist_channel(&ctx.config_path, self.channel)
            .await
            .with_context(|| format!("Failed to save channel to {}", ctx.config_path.display()))?;

        let previous = ctx.config.channel;
        ctx.config.channel = self.channel;
        ctx.say(format!(
            "{} {} -> {} ({})",
            "Channel".cyan().bold(),
            previous,
            self.channel.to_string().bold(),
            ctx.config.git_ref()
        ));

        if self.no_update {
            return Ok(());
        }
        run_update(&ctx).await
    }
}
