//! Snapshot store: last-known source collection, persisted for diffing.
//!
//! Persists a [`SnapshotFile`] JSON document at
//! `<data_dir>/snapshots/<collection_uid>.json`.
//! Writes go to a `.tmp` sibling first and are renamed into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mirror_core::CollectionUid;

use crate::error::{io_err, SyncError};

/// On-disk snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotFile {
    pub saved_at: DateTime<Utc>,
    pub fingerprint: String,
    pub collection: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotCompat {
    Enveloped(SnapshotEnvelopeCompat),
    Bare(Value),
}

#[derive(Debug, Deserialize)]
struct SnapshotEnvelopeCompat {
    saved_at: Option<DateTime<Utc>>,
    fingerprint: Option<String>,
    collection: Value,
}

/// `<data_dir>/snapshots/<collection_uid>.json`
pub fn snapshot_path_at(data_dir: &Path, uid: &CollectionUid) -> PathBuf {
    data_dir.join("snapshots").join(format!("{uid}.json"))
}

/// Load the snapshot for `uid`.
///
/// Returns `None` if the file does not yet exist. A file holding a bare
/// collection document (no envelope) is accepted; its fingerprint is
/// recomputed.
pub fn load_at(data_dir: &Path, uid: &CollectionUid) -> Result<Option<SnapshotFile>, SyncError> {
    let path = snapshot_path_at(data_dir, uid);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let snapshot = match serde_json::from_str::<SnapshotCompat>(&contents)? {
        SnapshotCompat::Enveloped(envelope) => {
            let fingerprint = match envelope.fingerprint {
                Some(fingerprint) => fingerprint,
                None => crate::change::fingerprint(&envelope.collection)?,
            };
            SnapshotFile {
                saved_at: envelope.saved_at.unwrap_or_else(Utc::now),
                fingerprint,
                collection: envelope.collection,
            }
        }
        SnapshotCompat::Bare(collection) => SnapshotFile {
            saved_at: Utc::now(),
            fingerprint: crate::change::fingerprint(&collection)?,
            collection,
        },
    };
    Ok(Some(snapshot))
}

/// Save the snapshot for `uid` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(
    data_dir: &Path,
    uid: &CollectionUid,
    snapshot: &SnapshotFile,
) -> Result<(), SyncError> {
    let path = snapshot_path_at(data_dir, uid);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid snapshot path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
