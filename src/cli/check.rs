//! Show what an update would change without touching the installation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::changelog::ChangelogBuilder;
use crate::config::Channel;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Channel to compare against instead of the configured one.
    #[arg(long, value_enum)]
    channel: Option<Channel>,
}

impl CommandExecutor for CheckCommand {
    async fn execute_with(self, mut ctx: CommandContext) -> Result<()> {
        if let Some(channel) = self.channel {
            ctx.config.channel = channel;
        }

        let check = ctx.updater()?.check().await?;

        if check.fresh {
            ctx.say(format!(
                "{} no manifest found; an update would install {} files",
                "Fresh install:".yellow().bold(),
                check.remote.len()
            ));
        }

        let changelog = ChangelogBuilder::new(&check.plan).git_ref(check.git_ref.clone()).build();
        ctx.say(changelog.render_colored().trim_end());

        if check.has_changes() {
            ctx.say(format!("Run {} to apply ({})", "mudsync update".cyan().bold(), check.mode));
        }
        Ok(())
    }
}
