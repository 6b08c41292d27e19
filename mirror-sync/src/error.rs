//! Error types for mirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use mirror_core::{CollectionUid, WorkspaceId};

use crate::transport::TransportError;

/// All errors that can arise from a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A call to the remote API failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response did not have the expected shape.
    #[error("malformed {what} response: {reason}")]
    MalformedResponse { what: &'static str, reason: String },

    /// Every credential in the pool was rate limited in a single sweep.
    #[error("all {attempts} API key(s) were rate limited")]
    CredentialsExhausted { attempts: usize },

    /// The destination is gone and the target forbids creating a new one.
    #[error("destination for workspace {workspace} is unavailable and auto-create is disallowed")]
    CreateDisallowed {
        workspace: WorkspaceId,
        destination: Option<CollectionUid>,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (snapshot store, fingerprint).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// True for the one failure the credential rotator retries on.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SyncError::Transport(TransportError::RateLimited))
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
