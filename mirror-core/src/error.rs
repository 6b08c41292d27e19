//! Error types for mirror-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or validating configuration.
///
/// Every variant is fatal: a configuration is either fully valid or not
/// constructed at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and serde_yaml line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("invalid source URL '{url}': {reason}")]
    InvalidSourceUrl { url: String, reason: String },

    #[error("loop interval {interval_ms} ms is below the {minimum_ms} ms minimum")]
    IntervalTooShort { interval_ms: u64, minimum_ms: u64 },

    #[error("at least one target workspace is required")]
    NoTargets,

    #[error("target #{index}: invalid workspace id '{value}'")]
    InvalidWorkspaceId { index: usize, value: String },

    #[error("target {target}: at least one API key is required")]
    NoCredentials { target: String },

    /// The offending key is never echoed back.
    #[error("target {target}: API key #{index} does not match the PMAK-<24 hex>-<34 hex> format")]
    InvalidCredential { target: String, index: usize },

    #[error("target {target}: invalid destination collection uid '{value}'")]
    InvalidDestination { target: String, value: String },

    #[error("target {target}: no destination collection and auto-create is disallowed")]
    CreateDisallowedWithoutDestination { target: String },

    #[error("{scope} schedule window #{index}: {source}")]
    InvalidWindow {
        scope: String,
        index: usize,
        #[source]
        source: WindowError,
    },
}

/// Reasons a single schedule window is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("{field} {value} is outside {min}..={max}")]
    HourOutOfRange {
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    #[error("start and end hour are both {hour}; use 0..24 for a full day")]
    EmptyWindow { hour: u8 },

    #[error("interval of {minutes} minutes is below the 0.5 minute minimum")]
    IntervalTooShort { minutes: f64 },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
