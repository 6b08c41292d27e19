//! The sync engine: one cycle of fetch, detect and per-target upsert.
//!
//! The engine owns every piece of mutable run state (target records with
//! their credential cursors, last-sync times, the change detector). Callers
//! drive it by calling [`SyncEngine::run_cycle`]; the daemon moves the whole
//! engine onto a blocking thread for each cycle and takes it back afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mirror_core::{
    CollectionUid, ScheduleWindow, SourceUrl, SyncConfiguration, TargetWorkspace, WorkspaceId,
};

use crate::audit::{AuditEntry, AuditLog};
use crate::change::ChangeDetector;
use crate::clock::{Clock, SystemClock};
use crate::error::SyncError;
use crate::events::{ErrorContext, EventBus, SyncEvent};
use crate::rotator::CredentialRotator;
use crate::schedule;
use crate::transport::CollectionApi;
use crate::upsert::{upsert, UpsertAction, UpsertRequest};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How far a cycle got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    FetchFailed,
    DetectFailed,
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TargetOutcome {
    Disabled,
    OutOfSchedule,
    IntervalPending,
    Inserted { destination: CollectionUid },
    Updated { destination: CollectionUid },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    pub target: WorkspaceId,
    pub label: Option<String>,
    #[serde(flatten)]
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: CycleStatus,
    /// Empty unless the content changed.
    pub targets: Vec<TargetReport>,
}

impl CycleReport {
    pub fn synced(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| {
                matches!(
                    t.outcome,
                    TargetOutcome::Inserted { .. } | TargetOutcome::Updated { .. }
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, TargetOutcome::Failed { .. }))
            .count()
    }

    pub fn outcome_for(&self, target: &WorkspaceId) -> Option<&TargetOutcome> {
        self.targets
            .iter()
            .find(|t| t.target == *target)
            .map(|t| &t.outcome)
    }
}

// ---------------------------------------------------------------------------
// Source fetch
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FetchResponse {
    collection: Map<String, Value>,
}

/// Fetch the source and check it has the `{ "collection": { ... } }` shape.
///
/// Returns the inner collection object.
pub fn fetch_source(api: &dyn CollectionApi, source: &SourceUrl) -> Result<Value, SyncError> {
    let body = api.fetch_collection(source.as_str())?;
    let parsed: FetchResponse =
        serde_json::from_value(body).map_err(|e| SyncError::MalformedResponse {
            what: "fetch collection",
            reason: e.to_string(),
        })?;
    Ok(Value::Object(parsed.collection))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct TargetSlot {
    workspace: TargetWorkspace,
    rotator: CredentialRotator,
}

pub struct SyncEngine {
    source_url: SourceUrl,
    global_schedule: Vec<ScheduleWindow>,
    targets: Vec<TargetSlot>,
    last_sync: HashMap<WorkspaceId, DateTime<Utc>>,
    detector: ChangeDetector,
    api: Arc<dyn CollectionApi>,
    audit: AuditLog,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    /// Build an engine for `config`, keeping snapshots and the audit log
    /// under `data_dir`.
    pub fn new(
        config: &SyncConfiguration,
        data_dir: &Path,
        api: Arc<dyn CollectionApi>,
    ) -> Result<Self, SyncError> {
        let detector = ChangeDetector::open(
            data_dir,
            config.source_url.collection_uid().clone(),
            config.structural_diff,
        )?;
        let targets = config
            .targets
            .iter()
            .map(|target| TargetSlot {
                workspace: target.clone(),
                rotator: CredentialRotator::new(target.api_keys.clone()),
            })
            .collect();
        Ok(Self {
            source_url: config.source_url.clone(),
            global_schedule: config.global_schedule.clone(),
            targets,
            last_sync: HashMap::new(),
            detector,
            api,
            audit: AuditLog::at(data_dir),
            events: EventBus::disabled(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Target records in declaration order, including destinations assigned
    /// by earlier cycles.
    pub fn targets(&self) -> impl Iterator<Item = &TargetWorkspace> {
        self.targets.iter().map(|slot| &slot.workspace)
    }

    pub fn last_sync(&self, target: &WorkspaceId) -> Option<DateTime<Utc>> {
        self.last_sync.get(target).copied()
    }

    /// Run one full cycle. Never fails as a whole; problems are reported as
    /// [`SyncEvent::Error`] and reflected in the returned report.
    pub fn run_cycle(&mut self) -> CycleReport {
        let started_at = self.clock.now();
        self.events.emit(SyncEvent::CycleStarted);
        tracing::debug!("cycle started for {}", self.source_url);

        let (status, targets) = self.cycle();
        let report = CycleReport {
            started_at,
            finished_at: self.clock.now(),
            status,
            targets,
        };
        tracing::info!(
            "cycle finished: {:?}, {} synced, {} failed",
            report.status,
            report.synced(),
            report.failed()
        );
        self.events.emit(SyncEvent::CycleCompleted {
            report: report.clone(),
        });
        report
    }

    fn cycle(&mut self) -> (CycleStatus, Vec<TargetReport>) {
        let collection = match fetch_source(self.api.as_ref(), &self.source_url) {
            Ok(collection) => collection,
            Err(err) => {
                tracing::error!("fetching {} failed: {err}", self.source_url);
                self.events.emit(SyncEvent::Error {
                    context: ErrorContext::FetchCollection,
                    error: err,
                });
                return (CycleStatus::FetchFailed, Vec::new());
            }
        };

        let change = match self.detector.detect(&collection) {
            Ok(change) => change,
            Err(err) => {
                tracing::error!("change detection failed: {err}");
                self.events.emit(SyncEvent::Error {
                    context: ErrorContext::DetectChange,
                    error: err,
                });
                return (CycleStatus::DetectFailed, Vec::new());
            }
        };

        if !change.changed {
            tracing::info!("no change in {}", self.source_url.collection_uid());
            self.events.emit(SyncEvent::Unchanged);
            return (CycleStatus::Unchanged, Vec::new());
        }

        let collection = Arc::new(collection);
        self.events.emit(SyncEvent::Changed {
            collection: Arc::clone(&collection),
            diff: change.diff,
            initial: change.initial,
        });

        let hour = self.clock.local_hour();
        let reports = (0..self.targets.len())
            .map(|index| self.sync_target(index, &collection, hour))
            .collect();
        (CycleStatus::Changed, reports)
    }

    fn sync_target(&mut self, index: usize, collection: &Arc<Value>, hour: u32) -> TargetReport {
        let Self {
            source_url,
            global_schedule,
            targets,
            last_sync,
            api,
            audit,
            events,
            clock,
            ..
        } = self;
        let slot = &mut targets[index];
        let target = &slot.workspace;
        let id = target.id;
        let name = target.display_name();
        let label = target.label.clone();
        let report = |outcome| TargetReport {
            target: id,
            label: label.clone(),
            outcome,
        };

        if !target.enabled {
            tracing::info!("target {name} is disabled, skipping");
            return report(TargetOutcome::Disabled);
        }

        let decision = schedule::evaluate(target, global_schedule, hour);
        if let Some(notice) = &decision.schedule_override {
            tracing::info!("target {name} schedule overrides the global schedule");
            events.emit(SyncEvent::ScheduleOverride(notice.clone()));
        }
        if !decision.eligible {
            tracing::info!("target {name} is outside its schedule at hour {hour}, skipping");
            return report(TargetOutcome::OutOfSchedule);
        }

        let now = clock.now();
        let interval = decision.interval();
        if !schedule::interval_elapsed(last_sync.get(&id).copied(), now, interval) {
            tracing::info!(
                "target {name} synced less than {}s ago, skipping",
                interval.num_seconds()
            );
            return report(TargetOutcome::IntervalPending);
        }
        last_sync.insert(id, now);

        let request = UpsertRequest {
            workspace: id,
            destination: target.destination.as_ref(),
            collection: collection.as_ref(),
            disallow_create: target.disallow_create,
        };
        let result = slot
            .rotator
            .with_retry(|key| upsert(api.as_ref(), key, request));

        let outcome = match result {
            Ok(done) if done.action == UpsertAction::Insert => {
                slot.workspace.destination = Some(done.destination.clone());
                tracing::info!("target {name}: created collection {}", done.destination);
                let entry = AuditEntry {
                    at: now,
                    target: id,
                    source: source_url,
                    destination: &done.destination,
                };
                match audit.append(&entry) {
                    Ok(()) => {
                        events.emit(SyncEvent::Inserted {
                            target: id,
                            destination: done.destination.clone(),
                            collection: Arc::clone(collection),
                        });
                        TargetOutcome::Inserted {
                            destination: done.destination,
                        }
                    }
                    Err(err) => {
                        tracing::error!("target {name}: audit write failed: {err}");
                        let message = err.to_string();
                        events.emit(SyncEvent::Error {
                            context: ErrorContext::SyncTarget(id),
                            error: err,
                        });
                        TargetOutcome::Failed { error: message }
                    }
                }
            }
            Ok(done) => {
                tracing::info!("target {name}: updated collection {}", done.destination);
                events.emit(SyncEvent::Updated {
                    target: id,
                    destination: done.destination.clone(),
                    collection: Arc::clone(collection),
                });
                TargetOutcome::Updated {
                    destination: done.destination,
                }
            }
            Err(err) => {
                tracing::warn!("target {name}: sync failed: {err}");
                let message = err.to_string();
                events.emit(SyncEvent::Error {
                    context: ErrorContext::SyncTarget(id),
                    error: err,
                });
                TargetOutcome::Failed { error: message }
            }
        };

        TargetReport {
            target: id,
            label,
            outcome,
        }
    }
}
