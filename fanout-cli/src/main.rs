//! Fanout — mirror file events from one directory tree into several others.
//!
//! # Usage
//!
//! ```text
//! fanout init --source <dir> --dest <dir> [--dest <dir>]... [--delay N] [--attempts N]
//! fanout check [--config <file>] [--json]
//! fanout watch [--config <file>] [--source <dir> --dest <dir>...] [--json-logs]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, init::InitArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    version,
    about = "Mirror created, deleted and renamed files into up to five destination trees",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate directories and write ~/.fanout/config.yaml.
    Init(InitArgs),

    /// Load and validate the configuration without watching.
    Check(CheckArgs),

    /// Watch the source tree in the foreground until ctrl-c.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Watch(args) => args.run(),
    }
}
