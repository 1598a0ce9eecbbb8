//! Report whether a newer updater build is published.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{CommandContext, CommandExecutor};
use crate::transport::HttpTransport;
use crate::upgrade::SelfUpdateChecker;

#[derive(Args, Debug)]
pub struct SelfCheckCommand {
    /// Download a newer build to this path and verify its checksum
    #[arg(long, value_name = "PATH")]
    download: Option<PathBuf>,
}

impl CommandExecutor for SelfCheckCommand {
    async fn execute_with(self, ctx: CommandContext) -> Result<()> {
        let checker = SelfUpdateChecker::new(ctx.config.self_update.descriptor_url.clone())
            .with_timeout(ctx.config.transport_options().request_timeout);

        if ctx.config.self_update.descriptor_url.is_none() {
            ctx.say("No version descriptor configured ([self_update] descriptor_url)");
            return Ok(());
        }

        match checker.check().await {
            Some(update) => {
                ctx.say(format!(
                    "{} {} -> {}",
                    "Updater update available:".green().bold(),
                    update.current,
                    update.latest.to_string().green().bold()
                ));
                if let Some(notes) = &update.descriptor.notes {
                    ctx.say(format!("  {notes}"));
                }
                ctx.say(format!("  Download: {}", update.descriptor.url));

                if let Some(dest) = &self.download {
                    let transport = HttpTransport::with_options(ctx.config.transport_options())?;
                    checker
                        .download_verified(&update, &transport, dest)
                        .await
                        .with_context(|| format!("Failed to download updater {}", update.latest))?;
                    ctx.say(format!("{} {}", "Verified build saved to".green(), dest.display()));
                }
            }
            None => ctx.say(format!("Updater {} is up to date", checker.current_version())),
        }
        Ok(())
    }
}
