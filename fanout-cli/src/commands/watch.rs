//! `fanout watch` — foreground watch session.

use anyhow::{Context, Result};
use clap::Args;

use fanout_daemon::start_blocking;

use super::{validate, ConfigArgs};

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Log as JSON lines instead of text.
    #[arg(long)]
    pub json_logs: bool,
}

impl WatchArgs {
    pub fn run(self) -> Result<()> {
        let raw = self.config.resolve()?;
        let config = validate(&raw)?;

        let summary = start_blocking(config, self.json_logs).context("watch session failed")?;
        println!(
            "{}",
            summary
                .to_json_pretty()
                .context("failed to render session summary")?
        );
        Ok(())
    }
}
