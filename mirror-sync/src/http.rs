//! Blocking HTTP implementation of [`CollectionApi`] on top of `ureq`.

use serde_json::{json, Value};

use mirror_core::{ApiKey, CollectionUid, WorkspaceId};

use crate::transport::{classify_status, CollectionApi, TransportError};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Talks to the collection API at `base_url` (no trailing slash).
#[derive(Debug, Clone)]
pub struct HttpApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("mirror/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn collections_url(&self) -> String {
        format!("{}/collections", self.base_url)
    }
}

impl CollectionApi for HttpApi {
    fn fetch_collection(&self, source_url: &str) -> Result<Value, TransportError> {
        let response = self.agent.get(source_url).call().map_err(map_ureq_error)?;
        read_json(response)
    }

    fn create_collection(
        &self,
        key: &ApiKey,
        workspace: &WorkspaceId,
        collection: &Value,
    ) -> Result<Value, TransportError> {
        tracing::debug!("POST collection into workspace {workspace} with key {key}");
        let response = self
            .agent
            .post(&self.collections_url())
            .query("workspace", &workspace.to_string())
            .set(API_KEY_HEADER, key.expose())
            .send_json(json!({ "collection": collection }))
            .map_err(map_ureq_error)?;
        read_json(response)
    }

    fn update_collection(
        &self,
        key: &ApiKey,
        uid: &CollectionUid,
        collection: &Value,
    ) -> Result<Value, TransportError> {
        tracing::debug!("PUT collection {uid} with key {key}");
        let response = self
            .agent
            .put(&format!("{}/{}", self.collections_url(), uid))
            .set(API_KEY_HEADER, key.expose())
            .send_json(json!({ "collection": collection }))
            .map_err(map_ureq_error)?;
        read_json(response)
    }
}

fn read_json(response: ureq::Response) -> Result<Value, TransportError> {
    response
        .into_json::<Value>()
        .map_err(|err| TransportError::InvalidBody(err.to_string()))
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            classify_status(code, body)
        }
        ureq::Error::Transport(transport) => {
            TransportError::Network(describe_transport(&transport))
        }
    }
}

/// ureq's own `Display` leads with the request URL, which for the source link
/// carries the access key in its query string.
fn describe_transport(transport: &ureq::Transport) -> String {
    match transport.message() {
        Some(message) => format!("{}: {message}", transport.kind()),
        None => transport.kind().to_string(),
    }
}
