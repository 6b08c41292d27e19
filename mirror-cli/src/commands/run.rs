//! `mirror run`: foreground sync loop.

use anyhow::{Context, Result};
use clap::Args;

use super::Paths;

/// Arguments for `mirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub fn run(self, paths: &Paths) -> Result<()> {
        let summary = mirror_daemon::start_blocking(&paths.config, &paths.home)
            .context("sync loop exited with error")?;
        println!(
            "stopped after {} cycle(s), {} overlapping tick(s) skipped",
            summary.cycles_started, summary.ticks_skipped
        );
        Ok(())
    }
}
