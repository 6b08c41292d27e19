//! Append-only record of auto-created destinations.
//!
//! One line per creation, tab separated `key=value` fields:
//!
//! ```text
//! 2024-05-01T11:00:00+00:00	target=<workspace>	source=<uid>	url=<source url>	destination=<uid>
//! ```
//!
//! The source URL is written without its query string so the access key never
//! reaches the file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use mirror_core::{CollectionUid, SourceUrl, WorkspaceId};

use crate::error::{io_err, SyncError};

pub const AUDIT_FILE_NAME: &str = "audit.log";

#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub at: DateTime<Utc>,
    pub target: WorkspaceId,
    pub source: &'a SourceUrl,
    pub destination: &'a CollectionUid,
}

impl AuditEntry<'_> {
    pub fn to_line(&self) -> String {
        format!(
            "{}\ttarget={}\tsource={}\turl={}\tdestination={}\n",
            self.at.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.target,
            self.source.collection_uid(),
            self.source.redacted(),
            self.destination
        )
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// `<data_dir>/audit.log`
    pub fn at(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(AUDIT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &AuditEntry<'_>) -> Result<(), SyncError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&self.path, e))?;
        file.write_all(entry.to_line().as_bytes())
            .map_err(|e| io_err(&self.path, e))
    }
}
