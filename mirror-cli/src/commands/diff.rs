//! `mirror diff`: compare the live source with the stored snapshot.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use mirror_sync::pipeline;

use super::Paths;

/// Arguments for `mirror diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Print the patch set as JSON instead of a unified diff.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self, paths: &Paths) -> Result<()> {
        let config = paths.load()?;
        let data_dir = paths.data_dir(&config);
        let api = pipeline::http_api(&config);

        let preview = pipeline::preview_diff(&config, &data_dir, api.as_ref())
            .with_context(|| format!("diff failed for {}", config.source_url))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&preview.patch).context("failed to serialize patch")?
            );
            return Ok(());
        }

        match preview.snapshot_saved_at {
            Some(saved_at) => println!(
                "snapshot from {}",
                saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("no snapshot stored yet; showing the full source"),
        }

        if preview.is_empty() {
            println!("No differences for {}.", config.source_url.collection_uid());
            return Ok(());
        }

        for line in preview.unified.lines() {
            let rendered = if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            };
            println!("{rendered}");
        }
        println!("{} change(s)", preview.patch.len());
        Ok(())
    }
}
