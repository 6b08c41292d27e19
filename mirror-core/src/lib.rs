//! Mirror core library: domain types, configuration loading, errors.
//!
//! - [`types`]: newtypes and validated configuration structs
//! - [`error`]: [`ConfigError`], [`WindowError`]
//! - [`config`]: YAML load + validation

pub mod config;
pub mod error;
pub mod types;

pub use error::{ConfigError, WindowError};
pub use types::{
    ApiKey, CollectionUid, ScheduleWindow, SourceUrl, SyncConfiguration, TargetWorkspace,
    WorkspaceId,
};
