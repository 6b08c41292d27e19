//! mirror: keep copies of one collection in sync across workspaces.
//!
//! # Usage
//!
//! ```text
//! mirror [--config <path>] check [--json]
//! mirror [--config <path>] sync [--json]
//! mirror [--config <path>] run
//! mirror [--config <path>] diff [--json]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, diff::DiffArgs, run::RunArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Propagate a source collection to target workspaces on a schedule",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ~/.mirror/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the config and summarise its targets.
    Check(CheckArgs),

    /// Run a single sync cycle and exit.
    Sync(SyncArgs),

    /// Run the sync loop in the foreground until ctrl-c.
    Run(RunArgs),

    /// Show how the source differs from the last stored snapshot.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = commands::Paths::resolve(cli.config)?;
    match cli.command {
        Commands::Check(args) => args.run(&paths),
        Commands::Sync(args) => args.run(&paths),
        Commands::Run(args) => args.run(&paths),
        Commands::Diff(args) => args.run(&paths),
    }
}
