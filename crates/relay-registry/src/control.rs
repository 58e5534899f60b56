//! Control-plane integration.
//!
//! The control plane is the sole owner of trigger objects. The broker
//! consumes it two ways:
//!
//! - a blocking paginated **listing** at startup (and on periodic
//!   resync), via [`TriggerSource`]
//! - asynchronous **upsert/delete notifications** pushed by an external
//!   watcher, drained by [`spawn_update_listener`] — the only writer the
//!   registry ever sees besides resync

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ControlPlaneError;
use crate::registry::TriggerRegistry;
use crate::types::{TriggerDescriptor, TriggerKey};

const LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// One page of the control plane's trigger listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPage {
    pub triggers: Vec<TriggerDescriptor>,
    /// Token for the next page; `None` on the last page.
    #[serde(default, rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
}

/// Anything that can produce the paginated trigger listing.
///
/// The production implementation is [`HttpTriggerSource`]; tests inject
/// in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait TriggerSource {
    async fn list(&self, page: Option<String>) -> Result<TriggerPage, ControlPlaneError>;
}

/// HTTP client for the control plane's trigger listing endpoint.
///
/// `GET {base}/namespaces/{namespace}/triggers[?continue=token]`
/// returning a JSON [`TriggerPage`].
pub struct HttpTriggerSource {
    client: Client<HttpConnector, Empty<Bytes>>,
    base: String,
    namespace: String,
    timeout: Duration,
}

impl HttpTriggerSource {
    pub fn new(base: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            base: base.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            timeout: LIST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn page_uri(&self, page: Option<&str>) -> String {
        let mut uri = format!("{}/namespaces/{}/triggers", self.base, self.namespace);
        if let Some(token) = page {
            uri.push_str("?continue=");
            uri.push_str(token);
        }
        uri
    }
}

impl TriggerSource for HttpTriggerSource {
    async fn list(&self, page: Option<String>) -> Result<TriggerPage, ControlPlaneError> {
        let uri: http::Uri = self
            .page_uri(page.as_deref())
            .parse()
            .map_err(|e: http::uri::InvalidUri| ControlPlaneError::Transport(e.to_string()))?;

        let request = http::Request::get(uri)
            .body(Empty::new())
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ControlPlaneError::Timeout(self.timeout))?
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ControlPlaneError::Status(response.status().as_u16()));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| ControlPlaneError::Transport(e.to_string()))?
            .to_bytes();

        Ok(serde_json::from_slice(&body)?)
    }
}

/// A single trigger change pushed by the external watcher.
#[derive(Debug, Clone)]
pub enum TriggerUpdate {
    Upsert(TriggerDescriptor),
    Delete(TriggerKey),
}

/// Drain watcher notifications into the registry.
///
/// Runs until the sender side is dropped. This task and the resync loop
/// are the registry's only writers; the dispatch path never mutates it.
pub fn spawn_update_listener(
    registry: Arc<TriggerRegistry>,
    mut updates: mpsc::Receiver<TriggerUpdate>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            match update {
                TriggerUpdate::Upsert(descriptor) => {
                    let key = descriptor.key();
                    registry.upsert(descriptor.into());
                    debug!(trigger = %key, "applied trigger upsert");
                }
                TriggerUpdate::Delete(key) => {
                    if !registry.remove(&key) {
                        warn!(trigger = %key, "delete for trigger that was not cached");
                    }
                }
            }
        }
        info!("trigger update stream closed");
    })
}
