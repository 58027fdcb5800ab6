pub mod check;
pub mod init;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fanout_core::{config, RawConfig, WatchConfig};

/// Where the watch configuration comes from, shared by `check` and `watch`.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Config file to read instead of ~/.fanout/config.yaml.
    #[arg(long, short = 'c', value_name = "FILE", conflicts_with = "source")]
    pub config: Option<PathBuf>,

    /// Source directory. With --dest, replaces the config file entirely.
    #[arg(long, short = 's', value_name = "DIR", requires = "destinations")]
    pub source: Option<PathBuf>,

    /// Destination directory; repeat for up to five. Blank values are ignored.
    #[arg(long = "dest", short = 'd', value_name = "DIR")]
    pub destinations: Vec<String>,

    /// Seconds to wait before each readiness attempt.
    #[arg(long, value_name = "SECS")]
    pub delay: Option<u64>,

    /// Readiness attempts before a new file is dropped.
    #[arg(long, value_name = "N")]
    pub attempts: Option<u32>,
}

impl ConfigArgs {
    /// Merge flags over the config file (or build from flags alone).
    pub fn resolve(&self) -> Result<RawConfig> {
        let mut raw = match &self.source {
            Some(source) => RawConfig::new(source, self.destinations.clone()),
            None => {
                let loaded = match &self.config {
                    Some(path) => config::load_from(path),
                    None => config::load(),
                };
                let mut raw = loaded.context(
                    "failed to load config — run `fanout init` or pass --source and --dest",
                )?;
                if !self.destinations.is_empty() {
                    raw.destinations = self.destinations.clone();
                }
                raw
            }
        };
        if let Some(delay) = self.delay {
            raw.stabilization.delay_secs = delay;
        }
        if let Some(attempts) = self.attempts {
            raw.stabilization.max_attempts = attempts;
        }
        Ok(raw)
    }
}

/// Validate, printing one line per problem before failing.
pub fn validate(raw: &RawConfig) -> Result<WatchConfig> {
    match raw.validate() {
        Ok(config) => Ok(config),
        Err(err) => {
            for problem in err.validation_errors() {
                eprintln!("{} {problem}", "✗".red());
            }
            Err(err).context("configuration is invalid")
        }
    }
}
