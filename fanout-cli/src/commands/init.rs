//! `fanout init --source <dir> --dest <dir>... [--delay N] [--attempts N]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fanout_core::{config, RawConfig};

use super::validate;

/// Validate directories and write ~/.fanout/config.yaml.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory tree to watch.
    #[arg(long, short = 's', value_name = "DIR")]
    pub source: PathBuf,

    /// Destination directory; repeat for up to five.
    #[arg(long = "dest", short = 'd', value_name = "DIR", required = true)]
    pub destinations: Vec<String>,

    /// Seconds to wait before each readiness attempt.
    #[arg(long, value_name = "SECS")]
    pub delay: Option<u64>,

    /// Readiness attempts before a new file is dropped.
    #[arg(long, value_name = "N")]
    pub attempts: Option<u32>,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        let mut raw = RawConfig::new(self.source, self.destinations);
        if let Some(delay) = self.delay {
            raw.stabilization.delay_secs = delay;
        }
        if let Some(attempts) = self.attempts {
            raw.stabilization.max_attempts = attempts;
        }

        // Persist the resolved directories so later runs do not depend on cwd.
        let resolved = validate(&raw)?;
        raw.source = resolved.source_root.clone();
        raw.destinations = resolved
            .destination_roots
            .iter()
            .map(|d| d.display().to_string())
            .collect();

        let path = config::save_at(&home, &raw)
            .with_context(|| format!("failed to write config under {}", home.display()))?;

        println!(
            "{} Watching '{}' into {} destination(s)",
            "✓".green(),
            resolved.source_root.display(),
            resolved.destination_roots.len()
        );
        println!("  Saved to: {}", path.display());
        Ok(())
    }
}
