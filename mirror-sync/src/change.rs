//! Change detection: content fingerprint plus optional structural diff.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

use mirror_core::CollectionUid;

use crate::diff::{self, PatchSet};
use crate::error::SyncError;
use crate::snapshot::{self, SnapshotFile};

/// SHA-256 hex digest of the document's `item` array, or of the whole
/// document when it has none.
///
/// `serde_json` maps keep their keys sorted, so the compact serialization is
/// deterministic for equal values.
pub fn fingerprint(document: &Value) -> Result<String, SyncError> {
    let subject = document.get("item").unwrap_or(document);
    let bytes = serde_json::to_vec(subject)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Result of one [`ChangeDetector::detect`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeOutcome {
    pub changed: bool,
    /// No previous fingerprint existed (cold start with no snapshot).
    pub initial: bool,
    /// Present only when changed and structural diffing is enabled.
    pub diff: Option<PatchSet>,
}

/// Remembers the last fingerprint for one source collection.
#[derive(Debug)]
pub struct ChangeDetector {
    data_dir: PathBuf,
    uid: CollectionUid,
    structural_diff: bool,
    fingerprint: Option<String>,
}

impl ChangeDetector {
    /// Seed the previous fingerprint from the persisted snapshot, if any.
    pub fn open(
        data_dir: &Path,
        uid: CollectionUid,
        structural_diff: bool,
    ) -> Result<Self, SyncError> {
        let fingerprint = snapshot::load_at(data_dir, &uid)?.map(|s| s.fingerprint);
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            uid,
            structural_diff,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Compare `document` against the previous fingerprint.
    ///
    /// The stored fingerprint only moves forward when the whole call
    /// succeeds, so a failed snapshot write is retried on the next call.
    pub fn detect(&mut self, document: &Value) -> Result<ChangeOutcome, SyncError> {
        let next = fingerprint(document)?;
        let initial = self.fingerprint.is_none();
        let changed = self.fingerprint.as_deref() != Some(next.as_str());

        if !changed {
            return Ok(ChangeOutcome {
                changed: false,
                initial: false,
                diff: None,
            });
        }

        let diff = if self.structural_diff {
            let previous = snapshot::load_at(&self.data_dir, &self.uid)?;
            let patch = diff::compute(previous.as_ref().map(|s| &s.collection), document);
            snapshot::save_at(
                &self.data_dir,
                &self.uid,
                &SnapshotFile {
                    saved_at: Utc::now(),
                    fingerprint: next.clone(),
                    collection: document.clone(),
                },
            )?;
            Some(patch)
        } else {
            None
        };

        tracing::debug!(
            "collection {} changed (fingerprint {})",
            self.uid,
            &next[..12]
        );
        self.fingerprint = Some(next);
        Ok(ChangeOutcome {
            changed: true,
            initial,
            diff,
        })
    }
}
