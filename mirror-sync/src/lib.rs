//! # mirror-sync
//!
//! Change detection and fan-out of one source collection to its target
//! workspaces.
//!
//! Build a [`SyncEngine`] from a validated configuration and call
//! [`SyncEngine::run_cycle`], or use [`pipeline::run_once`] for a one-shot
//! run. Lifecycle notifications arrive on the channel returned by
//! [`EventBus::channel`].

pub mod audit;
pub mod change;
pub mod clock;
pub mod diff;
pub mod engine;
pub mod error;
pub mod events;
pub mod http;
pub mod pipeline;
pub mod rotator;
pub mod schedule;
pub mod snapshot;
pub mod transport;
pub mod upsert;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{CycleReport, CycleStatus, SyncEngine, TargetOutcome, TargetReport};
pub use error::SyncError;
pub use events::{ErrorContext, EventBus, SyncEvent};
pub use transport::{CollectionApi, TransportError};
