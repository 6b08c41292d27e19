//! `mirror sync`: run one cycle against the configured targets.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use mirror_sync::{pipeline, CycleReport, CycleStatus, EventBus, SyncEvent, TargetOutcome};

use super::Paths;

/// Arguments for `mirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Print the cycle report as JSON instead of live events.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, paths: &Paths) -> Result<()> {
        let config = paths.load()?;
        let data_dir = paths.data_dir(&config);
        let api = pipeline::http_api(&config);

        let report = if self.json {
            let report = pipeline::run_once(&config, &data_dir, api, EventBus::disabled())
                .context("sync failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
            report
        } else {
            let (events, mut rx) = EventBus::channel();
            let printer = std::thread::spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    print_event(&event);
                }
            });
            let report =
                pipeline::run_once(&config, &data_dir, api, events).context("sync failed")?;
            printer
                .join()
                .map_err(|_| anyhow!("event printer thread panicked"))?;
            report
        };

        check_report(&report)
    }
}

fn check_report(report: &CycleReport) -> Result<()> {
    match report.status {
        CycleStatus::FetchFailed => bail!("could not fetch the source collection"),
        CycleStatus::DetectFailed => bail!("change detection failed"),
        CycleStatus::Unchanged | CycleStatus::Changed => {}
    }
    if report.failed() > 0 {
        bail!("{} target(s) failed to sync", report.failed());
    }
    Ok(())
}

fn print_event(event: &SyncEvent) {
    let at = Local::now().format("%H:%M:%S").to_string().bright_black();
    match event {
        SyncEvent::CycleStarted => println!("{at} {} cycle started", "▶".cyan()),
        SyncEvent::Changed { diff, initial, .. } => {
            let detail = match (initial, diff) {
                (true, _) => "first sight, no previous snapshot".to_string(),
                (false, Some(patch)) => format!("{} operation(s)", patch.len()),
                (false, None) => "content changed".to_string(),
            };
            println!("{at} {} source changed ({detail})", "Δ".yellow().bold());
        }
        SyncEvent::Unchanged => println!("{at} {} source unchanged", "=".bright_black()),
        SyncEvent::Inserted {
            target,
            destination,
            ..
        } => println!("{at} {} {target}: created {destination}", "+".green().bold()),
        SyncEvent::Updated {
            target,
            destination,
            ..
        } => println!("{at} {} {target}: updated {destination}", "✓".green()),
        SyncEvent::ScheduleOverride(notice) => println!(
            "{at} {} {}: own schedule overrides the global schedule",
            "!".yellow(),
            notice
                .label
                .clone()
                .unwrap_or_else(|| notice.target.to_string())
        ),
        SyncEvent::Error { context, error } => {
            println!("{at} {} [{context}] {error}", "✗".red().bold())
        }
        SyncEvent::CycleCompleted { report } => {
            for target in &report.targets {
                let name = target
                    .label
                    .clone()
                    .unwrap_or_else(|| target.target.to_string());
                let skipped = match target.outcome {
                    TargetOutcome::Disabled => "disabled",
                    TargetOutcome::OutOfSchedule => "outside schedule",
                    TargetOutcome::IntervalPending => "interval not elapsed",
                    _ => continue,
                };
                println!("{at} {} {name}: skipped ({skipped})", "-".bright_black());
            }
            println!(
                "{at} {} cycle completed: {} synced, {} failed",
                "■".cyan(),
                report.synced(),
                report.failed()
            );
        }
    }
}
