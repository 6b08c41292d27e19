use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use mirror_core::config;
use mirror_sync::{pipeline, EventBus, SyncEngine, SyncEvent};

use crate::error::{io_err, DaemonError};

/// Set to `json` for one JSON object per log line.
pub const LOG_FORMAT_ENV: &str = "MIRROR_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Counters for one run of the tick loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub cycles_started: u64,
    /// Ticks that fired while a cycle was still in flight.
    pub ticks_skipped: u64,
}

/// Start the daemon and block the current thread until it exits.
pub fn start_blocking(config_path: &Path, home: &Path) -> Result<LoopSummary, DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config_path.to_path_buf(), home.to_path_buf()))
}

/// Load the config, run the tick loop until ctrl-c, then wait for the cycle
/// in flight (if any) to finish.
pub async fn run(config_path: PathBuf, home: PathBuf) -> Result<LoopSummary, DaemonError> {
    let config = config::load_from(&config_path)?;
    let data_dir = config::resolve_data_dir(&config, &home);

    let (events, events_rx) = EventBus::channel();
    let engine =
        SyncEngine::new(&config, &data_dir, pipeline::http_api(&config))?.with_events(events);
    let logger = tokio::spawn(log_events(events_rx));

    tracing::info!(
        source = %config.source_url,
        targets = config.targets.len(),
        interval_ms = config.min_interval.as_millis() as u64,
        data_dir = %data_dir.display(),
        "mirror daemon started"
    );

    let sync_loop = SyncLoop::spawn(engine, config.min_interval);
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, stopping after the current cycle"),
        Err(err) => tracing::error!(error = %err, "ctrl-c handler failed, stopping"),
    }
    sync_loop.stop();
    let summary = sync_loop.join().await?;

    // The engine is gone once the loop has joined, which closes the event
    // channel and ends the logger.
    logger
        .await
        .map_err(|err| DaemonError::Runtime(format!("event logger join failure: {err}")))?;

    tracing::info!(
        cycles = summary.cycles_started,
        skipped_ticks = summary.ticks_skipped,
        "mirror daemon stopped"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tick loop
// ---------------------------------------------------------------------------

/// Recurring driver for one [`SyncEngine`].
///
/// Each tick moves the engine onto a blocking thread for one cycle. A tick
/// that fires while the engine is away is skipped; nothing is queued.
pub struct SyncLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<LoopSummary, DaemonError>>,
}

impl SyncLoop {
    /// Start ticking every `period`; the first tick fires immediately.
    pub fn spawn(engine: SyncEngine, period: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(engine, period, stop_rx));
        Self { stop_tx, handle }
    }

    /// No further cycles start after this. A cycle in flight is not
    /// interrupted.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the loop to exit, including the last cycle in flight.
    pub async fn join(self) -> Result<LoopSummary, DaemonError> {
        self.handle
            .await
            .map_err(|err| DaemonError::Runtime(format!("sync loop join failure: {err}")))?
    }
}

async fn tick_loop(
    engine: SyncEngine,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<LoopSummary, DaemonError> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut summary = LoopSummary::default();
    let mut idle = Some(engine);
    let mut in_flight: Option<JoinHandle<SyncEngine>> = None;

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                if let Some(handle) = in_flight.take() {
                    if !handle.is_finished() {
                        summary.ticks_skipped += 1;
                        tracing::info!("previous sync cycle still running, skipping tick");
                        in_flight = Some(handle);
                        continue;
                    }
                    idle = Some(reclaim(handle).await?);
                }

                let Some(mut engine) = idle.take() else {
                    continue;
                };
                summary.cycles_started += 1;
                tracing::debug!(cycle = summary.cycles_started, "starting sync cycle");
                in_flight = Some(tokio::task::spawn_blocking(move || {
                    engine.run_cycle();
                    engine
                }));
            }
        }
    }

    if let Some(handle) = in_flight.take() {
        tracing::info!("waiting for the current sync cycle to finish");
        reclaim(handle).await?;
    }
    Ok(summary)
}

async fn reclaim(handle: JoinHandle<SyncEngine>) -> Result<SyncEngine, DaemonError> {
    handle
        .await
        .map_err(|err| DaemonError::Runtime(format!("sync cycle join failure: {err}")))
}

// ---------------------------------------------------------------------------
// Event logging
// ---------------------------------------------------------------------------

async fn log_events(mut rx: UnboundedReceiver<SyncEvent>) {
    while let Some(event) = rx.recv().await {
        log_event(&event);
    }
}

/// Write one lifecycle event to the tracing subscriber.
pub fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::CycleStarted => tracing::debug!("sync cycle started"),
        SyncEvent::Changed { diff, initial, .. } => tracing::info!(
            initial = *initial,
            operations = diff.as_ref().map(|d| d.len()),
            "source collection changed"
        ),
        SyncEvent::Unchanged => tracing::info!("source collection unchanged"),
        SyncEvent::Inserted {
            target,
            destination,
            ..
        } => tracing::info!(
            target = %target,
            destination = %destination,
            "destination collection created"
        ),
        SyncEvent::Updated {
            target,
            destination,
            ..
        } => tracing::info!(
            target = %target,
            destination = %destination,
            "destination collection updated"
        ),
        SyncEvent::ScheduleOverride(notice) => tracing::info!(
            target = %notice.target,
            label = notice.label.as_deref().unwrap_or(""),
            target_windows = notice.target_schedule.len(),
            global_windows = notice.global_schedule.len(),
            "target schedule overrides the global schedule"
        ),
        SyncEvent::Error { context, error } => {
            tracing::error!(context = %context, error = %error, "sync error")
        }
        SyncEvent::CycleCompleted { report } => {
            tracing::info!(
                status = ?report.status,
                synced = report.synced(),
                failed = report.failed(),
                duration_ms = (report.finished_at - report.started_at).num_milliseconds(),
                "sync cycle completed"
            );
            match serde_json::to_string(report) {
                Ok(json) => tracing::debug!(report = %json, "cycle report"),
                Err(err) => tracing::warn!(error = %err, "could not serialize cycle report"),
            }
        }
    }
}

/// Install the global subscriber. `RUST_LOG` filters (default `info`);
/// [`LOG_FORMAT_ENV`] picks the output format.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let format = LogFormat::from_env_value(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_text() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some(" JSON ")), LogFormat::Json);
    }

    #[test]
    fn loop_summary_serializes_counters() {
        let summary = LoopSummary {
            cycles_started: 3,
            ticks_skipped: 1,
        };
        assert_eq!(
            serde_json::to_value(summary).expect("json"),
            serde_json::json!({"cycles_started": 3, "ticks_skipped": 1})
        );
    }
}
