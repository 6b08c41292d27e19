//! YAML configuration loading and validation.
//!
//! # Storage layout
//!
//! ```text
//! ~/.mirror/
//!   config.yaml      (default config location)
//!   data/            (default data_dir: snapshots + audit.log)
//! ```
//!
//! # API pattern
//!
//! Loaders come in two forms, as with every path-based API in this workspace:
//! - `fn_at(home: &Path, …)` / `load_from(path)`: explicit location; used in tests
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Parsing goes through raw serde structs first; [`validate`] turns them into
//! the domain types in [`crate::types`] or fails on the first violation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{io_err, ConfigError};
use crate::types::{
    ApiKey, CollectionUid, ScheduleWindow, SourceUrl, SyncConfiguration, TargetWorkspace,
    WorkspaceId, DEFAULT_API_BASE_URL, MIN_LOOP_INTERVAL,
};

const SOURCE_HOSTS: [&str; 2] = ["api.getpostman.com", "api.postman.com"];

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.mirror/`
pub fn mirror_root(home: &Path) -> PathBuf {
    home.join(".mirror")
}

/// `<home>/.mirror/config.yaml` (pure, no I/O).
pub fn config_path_at(home: &Path) -> PathBuf {
    mirror_root(home).join("config.yaml")
}

/// `<home>/.mirror/data/`
pub fn default_data_dir_at(home: &Path) -> PathBuf {
    mirror_root(home).join("data")
}

/// The configured data directory, or the default one under `home`.
pub fn resolve_data_dir(config: &SyncConfiguration, home: &Path) -> PathBuf {
    config
        .data_dir
        .clone()
        .unwrap_or_else(|| default_data_dir_at(home))
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// 2. Raw (unvalidated) shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub source_url: String,
    pub min_interval_ms: u64,
    #[serde(default)]
    pub global_schedule: Vec<RawWindow>,
    #[serde(default)]
    pub targets: Vec<RawTarget>,
    #[serde(default = "default_true")]
    pub structural_diff: bool,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTarget {
    pub workspace_id: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub collection_uid: Option<String>,
    #[serde(default)]
    pub schedule: Vec<RawWindow>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub disallow_create: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWindow {
    pub start_hour: u8,
    pub end_hour: u8,
    pub interval_minutes: f64,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent, `ConfigError::Parse`
/// (with path + line context) if malformed YAML, or the first validation error.
pub fn load_from(path: &Path) -> Result<SyncConfiguration, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_str(&contents).map_err(|err| match err {
        ParseOrInvalid::Parse(source) => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseOrInvalid::Invalid(err) => err,
    })
}

/// Load `<home>/.mirror/config.yaml`.
pub fn load_at(home: &Path) -> Result<SyncConfiguration, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfiguration, ConfigError> {
    load_at(&home()?)
}

/// Parse and validate a YAML document held in memory.
pub fn from_yaml(contents: &str) -> Result<SyncConfiguration, ConfigError> {
    parse_str(contents).map_err(|err| match err {
        ParseOrInvalid::Parse(source) => ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        },
        ParseOrInvalid::Invalid(err) => err,
    })
}

enum ParseOrInvalid {
    Parse(serde_yaml::Error),
    Invalid(ConfigError),
}

fn parse_str(contents: &str) -> Result<SyncConfiguration, ParseOrInvalid> {
    let raw: RawConfig = serde_yaml::from_str(contents).map_err(ParseOrInvalid::Parse)?;
    validate(raw).map_err(ParseOrInvalid::Invalid)
}

// ---------------------------------------------------------------------------
// 4. Validation
// ---------------------------------------------------------------------------

/// Turn a raw config into a [`SyncConfiguration`], failing on the first
/// violation.
pub fn validate(raw: RawConfig) -> Result<SyncConfiguration, ConfigError> {
    let source_url = parse_source_url(&raw.source_url)?;

    let min_interval = Duration::from_millis(raw.min_interval_ms);
    if min_interval < MIN_LOOP_INTERVAL {
        return Err(ConfigError::IntervalTooShort {
            interval_ms: raw.min_interval_ms,
            minimum_ms: MIN_LOOP_INTERVAL.as_millis() as u64,
        });
    }

    let global_schedule = validate_windows("global", &raw.global_schedule)?;

    if raw.targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    let targets = raw
        .targets
        .into_iter()
        .enumerate()
        .map(|(index, target)| validate_target(index, target))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SyncConfiguration {
        source_url,
        min_interval,
        global_schedule,
        targets,
        structural_diff: raw.structural_diff,
        data_dir: raw.data_dir,
        api_base_url: raw
            .api_base_url
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
    })
}

/// `https://api.getpostman.com/collections/<uid>?access_key=<key>`
pub fn parse_source_url(value: &str) -> Result<SourceUrl, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSourceUrl {
        url: redact_query(value),
        reason: reason.to_string(),
    };

    let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "https" {
        return Err(invalid("scheme must be https"));
    }
    match url.host_str() {
        Some(host) if SOURCE_HOSTS.contains(&host) => {}
        _ => return Err(invalid("host must be api.getpostman.com or api.postman.com")),
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let uid = match segments.as_slice() {
        ["collections", uid] => *uid,
        _ => return Err(invalid("path must be /collections/<collection uid>")),
    };
    let collection = CollectionUid::parse(uid).ok_or_else(|| invalid("malformed collection uid"))?;

    let has_access_key = url
        .query_pairs()
        .any(|(key, value)| key == "access_key" && !value.is_empty());
    if !has_access_key {
        return Err(invalid("missing access_key query parameter"));
    }

    Ok(SourceUrl::new(url, collection))
}

fn validate_target(index: usize, raw: RawTarget) -> Result<TargetWorkspace, ConfigError> {
    let id = WorkspaceId::parse(&raw.workspace_id).ok_or_else(|| {
        ConfigError::InvalidWorkspaceId {
            index,
            value: raw.workspace_id.clone(),
        }
    })?;
    let name = id.to_string();

    if raw.api_keys.is_empty() {
        return Err(ConfigError::NoCredentials { target: name });
    }
    let api_keys = raw
        .api_keys
        .iter()
        .enumerate()
        .map(|(key_index, key)| {
            ApiKey::parse(key.trim()).ok_or_else(|| ConfigError::InvalidCredential {
                target: name.clone(),
                index: key_index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let destination = match raw.collection_uid.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(CollectionUid::parse(value).ok_or_else(|| {
            ConfigError::InvalidDestination {
                target: name.clone(),
                value: value.to_string(),
            }
        })?),
    };
    if destination.is_none() && raw.disallow_create {
        return Err(ConfigError::CreateDisallowedWithoutDestination { target: name });
    }

    let schedule = validate_windows(&format!("target {name}"), &raw.schedule)?;

    Ok(TargetWorkspace {
        id,
        api_keys,
        destination,
        schedule,
        enabled: raw.enabled,
        label: raw.label.filter(|label| !label.trim().is_empty()),
        disallow_create: raw.disallow_create,
    })
}

fn validate_windows(scope: &str, raw: &[RawWindow]) -> Result<Vec<ScheduleWindow>, ConfigError> {
    raw.iter()
        .enumerate()
        .map(|(index, window)| {
            ScheduleWindow::new(window.start_hour, window.end_hour, window.interval_minutes)
                .map_err(|source| ConfigError::InvalidWindow {
                    scope: scope.to_string(),
                    index,
                    source,
                })
        })
        .collect()
}

fn redact_query(value: &str) -> String {
    match value.split_once('?') {
        Some((base, _)) => format!("{base}?…"),
        None => value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
