//! Lifecycle notifications emitted by the engine.
//!
//! Events travel over an unbounded tokio channel; the daemon logs them and
//! `mirror sync` prints them. Nothing is dispatched globally.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use mirror_core::{CollectionUid, WorkspaceId};

use crate::diff::PatchSet;
use crate::engine::CycleReport;
use crate::error::SyncError;
use crate::schedule::ScheduleOverride;

/// Stage a reported error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    FetchCollection,
    DetectChange,
    SyncTarget(WorkspaceId),
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorContext::FetchCollection => f.write_str("fetchCollection"),
            ErrorContext::DetectChange => f.write_str("detectChange"),
            ErrorContext::SyncTarget(id) => write!(f, "syncTarget:{id}"),
        }
    }
}

#[derive(Debug)]
pub enum SyncEvent {
    CycleStarted,
    Changed {
        collection: Arc<Value>,
        diff: Option<PatchSet>,
        /// First detection with no previous fingerprint.
        initial: bool,
    },
    Unchanged,
    Inserted {
        target: WorkspaceId,
        destination: CollectionUid,
        collection: Arc<Value>,
    },
    Updated {
        target: WorkspaceId,
        destination: CollectionUid,
        collection: Arc<Value>,
    },
    ScheduleOverride(ScheduleOverride),
    Error {
        context: ErrorContext,
        error: SyncError,
    },
    CycleCompleted {
        report: CycleReport,
    },
}

impl SyncEvent {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::CycleStarted => "cycle_started",
            SyncEvent::Changed { .. } => "changed",
            SyncEvent::Unchanged => "unchanged",
            SyncEvent::Inserted { .. } => "inserted",
            SyncEvent::Updated { .. } => "updated",
            SyncEvent::ScheduleOverride(_) => "schedule_override",
            SyncEvent::Error { .. } => "error",
            SyncEvent::CycleCompleted { .. } => "cycle_completed",
        }
    }
}

/// Sending half held by the engine.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    tx: Option<UnboundedSender<SyncEvent>>,
}

impl EventBus {
    pub fn channel() -> (Self, UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A bus that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening any more.
            let _ = tx.send(event);
        }
    }
}
