//! Remote API abstraction.
//!
//! The engine never talks HTTP directly; it goes through [`CollectionApi`].
//! [`crate::http::HttpApi`] is the production implementation and tests plug
//! in scripted fakes.

use serde_json::Value;
use thiserror::Error;

use mirror_core::{ApiKey, CollectionUid, WorkspaceId};

/// Transport-level failures, already classified by status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// HTTP 429.
    #[error("rate limited")]
    RateLimited,

    /// HTTP 404.
    #[error("not found")]
    NotFound,

    /// HTTP 403.
    #[error("forbidden")]
    Forbidden,

    /// Any other non-success status.
    #[error("unexpected status {code}: {body}")]
    Status { code: u16, body: String },

    /// DNS, TLS, connection reset and similar.
    #[error("network error: {0}")]
    Network(String),

    /// The body could not be decoded as JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// A destination that no longer exists or is no longer ours; the upsert
    /// falls back to creating a fresh one.
    pub fn is_missing_destination(&self) -> bool {
        matches!(self, TransportError::NotFound | TransportError::Forbidden)
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(code: u16, body: String) -> TransportError {
    match code {
        429 => TransportError::RateLimited,
        404 => TransportError::NotFound,
        403 => TransportError::Forbidden,
        _ => TransportError::Status { code, body },
    }
}

/// The three remote calls a sync cycle needs.
///
/// Calls are blocking; the daemon runs cycles on a blocking thread.
pub trait CollectionApi: Send + Sync {
    /// `GET` the read-only source link. Returns the raw JSON body.
    fn fetch_collection(&self, source_url: &str) -> Result<Value, TransportError>;

    /// Create a new collection in `workspace`. Returns the raw JSON body.
    fn create_collection(
        &self,
        key: &ApiKey,
        workspace: &WorkspaceId,
        collection: &Value,
    ) -> Result<Value, TransportError>;

    /// Replace the collection `uid`. Returns the raw JSON body.
    fn update_collection(
        &self,
        key: &ApiKey,
        uid: &CollectionUid,
        collection: &Value,
    ) -> Result<Value, TransportError>;
}
