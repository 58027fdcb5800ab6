//! `fanout check` — show the configuration a watch would use.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use fanout_core::WatchConfig;

use super::{validate, ConfigArgs};

/// Arguments for `fanout check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    source: String,
    destinations: Vec<String>,
    delay_secs: u64,
    max_attempts: u32,
}

impl From<&WatchConfig> for CheckReport {
    fn from(config: &WatchConfig) -> Self {
        Self {
            source: config.source_root.display().to_string(),
            destinations: config
                .destination_roots
                .iter()
                .map(|d| d.display().to_string())
                .collect(),
            delay_secs: config.stabilization.delay.as_secs(),
            max_attempts: config.stabilization.max_attempts,
        }
    }
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let raw = self.config.resolve()?;
        let config = validate(&raw)?;
        let report = CheckReport::from(&config);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{} configuration is valid", "✓".green());
        println!("  source:       {}", report.source.bold());
        for (i, dest) in report.destinations.iter().enumerate() {
            println!("  destination {}: {dest}", i + 1);
        }
        println!(
            "  readiness:    {}s delay, {} attempt(s)",
            report.delay_secs, report.max_attempts
        );
        Ok(())
    }
}
