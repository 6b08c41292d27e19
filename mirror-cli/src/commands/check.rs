//! `mirror check`: validate the config and summarise what would be synced.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use mirror_core::{ScheduleWindow, SyncConfiguration, TargetWorkspace};

use super::Paths;

/// Arguments for `mirror check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn run(self, paths: &Paths) -> Result<()> {
        let config = paths.load()?;
        let data_dir = paths.data_dir(&config);

        if self.json {
            let payload = CheckJson {
                config: paths.config.display().to_string(),
                source_url: config.source_url.redacted(),
                collection_uid: config.source_url.collection_uid().to_string(),
                interval_ms: config.min_interval.as_millis() as u64,
                structural_diff: config.structural_diff,
                data_dir: data_dir.display().to_string(),
                global_schedule: config.global_schedule.clone(),
                targets: config.targets.iter().map(TargetJson::from).collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize check JSON")?
            );
            return Ok(());
        }

        print_summary(&config, &data_dir.display().to_string());
        Ok(())
    }
}

#[derive(Serialize)]
struct CheckJson {
    config: String,
    source_url: String,
    collection_uid: String,
    interval_ms: u64,
    structural_diff: bool,
    data_dir: String,
    global_schedule: Vec<ScheduleWindow>,
    targets: Vec<TargetJson>,
}

#[derive(Serialize)]
struct TargetJson {
    workspace_id: String,
    label: Option<String>,
    enabled: bool,
    api_keys: usize,
    collection_uid: Option<String>,
    disallow_create: bool,
    schedule: Vec<ScheduleWindow>,
}

impl From<&TargetWorkspace> for TargetJson {
    fn from(target: &TargetWorkspace) -> Self {
        Self {
            workspace_id: target.id.to_string(),
            label: target.label.clone(),
            enabled: target.enabled,
            api_keys: target.api_keys.len(),
            collection_uid: target.destination.as_ref().map(ToString::to_string),
            disallow_create: target.disallow_create,
            schedule: target.schedule.clone(),
        }
    }
}

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "workspace")]
    workspace: String,
    #[tabled(rename = "enabled")]
    enabled: String,
    #[tabled(rename = "keys")]
    keys: usize,
    #[tabled(rename = "destination")]
    destination: String,
    #[tabled(rename = "schedule")]
    schedule: String,
}

fn print_summary(config: &SyncConfiguration, data_dir: &str) {
    println!(
        "mirror v{} | {} | every {}s | {} target(s)",
        env!("CARGO_PKG_VERSION"),
        config.source_url,
        config.min_interval.as_secs(),
        config.targets.len(),
    );
    println!("data dir: {data_dir}");
    if !config.global_schedule.is_empty() {
        println!("global schedule: {}", format_windows(&config.global_schedule));
    }

    let rows: Vec<TargetRow> = config
        .targets
        .iter()
        .map(|target| TargetRow {
            workspace: target.display_name(),
            enabled: if target.enabled {
                "yes".green().to_string()
            } else {
                "no".yellow().to_string()
            },
            keys: target.api_keys.len(),
            destination: match (&target.destination, target.disallow_create) {
                (Some(uid), true) => format!("{uid} (no create)"),
                (Some(uid), false) => uid.to_string(),
                (None, _) => "auto-create".to_string(),
            },
            schedule: describe_schedule(target, &config.global_schedule),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} configuration is valid", "✓".green().bold());
}

fn describe_schedule(target: &TargetWorkspace, global: &[ScheduleWindow]) -> String {
    match (target.schedule.is_empty(), global.is_empty()) {
        (false, false) => format!("{} (overrides global)", format_windows(&target.schedule)),
        (false, true) => format_windows(&target.schedule),
        (true, false) => "global".to_string(),
        (true, true) => "always".to_string(),
    }
}

fn format_windows(windows: &[ScheduleWindow]) -> String {
    windows
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
