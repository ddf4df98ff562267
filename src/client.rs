use std::collections::HashMap;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::error::{EngineError, Result};
use crate::events::{error_job_id, parse_event, PushEvent};
use crate::graph::WorkflowGraph;
use crate::types::{ArtifactRef, HistoryRecord};

/// Default budget for [`EngineClient::await_completion`].
pub const DEFAULT_WAIT: Duration = Duration::from_secs(300);

fn normalize(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[derive(Debug, Deserialize)]
struct QueuedJob {
    prompt_id: String,
}

#[derive(Debug, Deserialize)]
struct StoredImage {
    name: String,
}

/// Async client for one image-generation engine.
///
/// Submits workflow graphs, tracks their completion over the engine's push
/// channel, and downloads produced artifacts. Each client carries a
/// process-lifetime session id (UUID v4) that scopes its submissions and its
/// push-channel subscription, so a client only reacts to events for jobs it
/// queued. The client is cheap to clone and safe to share across concurrent
/// calls; every wait opens its own channel connection.
///
/// # Example
/// ```no_run
/// use comfy_link::{EngineClient, GenerationRequest, DEFAULT_WAIT};
///
/// # async fn example() -> comfy_link::Result<()> {
/// let client = EngineClient::new("http://127.0.0.1:8188");
/// let graph = GenerationRequest::new("a sunset over mountains").text_to_image();
/// let images = client.generate(&graph, DEFAULT_WAIT).await?;
/// println!("got {} image(s)", images.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl EngineClient {
    /// Create a client for the engine at `base_url` (e.g.
    /// `http://127.0.0.1:8188`) with a fresh session id.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize(base_url.into()),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Use a custom `reqwest::Client` (timeouts, TLS, proxies).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// The configured engine base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// This client's session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn channel_url(&self) -> String {
        let ws_base = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        format!("{}/ws?clientId={}", ws_base, self.session_id)
    }

    // ---- Transport ----

    /// Upload a source image for image-to-image generation. Returns the
    /// engine-side filename to reference from the graph. The engine is asked
    /// to overwrite an existing file of the same name, so retries are safe.
    pub async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> Result<String> {
        let url = format!("{}/upload/image", self.base_url);
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("image/png")
            .map_err(|e| EngineError::Network {
                context: "failed to build image upload part".into(),
                source: e,
            })?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("overwrite", "true");

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let resp = require_success(resp).await?;

        let stored: StoredImage = resp.json().await.map_err(|e| EngineError::Network {
            context: "failed to parse upload response".into(),
            source: e,
        })?;
        debug!(filename = %stored.name, "image uploaded");
        Ok(stored.name)
    }

    /// Submit a workflow graph for execution. Returns the engine-assigned
    /// job id. A graph the engine rejects (malformed node reference, unknown
    /// operation) surfaces as [`EngineError::Transport`] with the engine's
    /// diagnostic body intact.
    pub async fn submit(&self, graph: &WorkflowGraph) -> Result<String> {
        let url = format!("{}/prompt", self.base_url);
        let body = serde_json::json!({
            "prompt": graph,
            "client_id": self.session_id,
        });

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let resp = require_success(resp).await?;

        let queued: QueuedJob = resp.json().await.map_err(|_| {
            EngineError::InvalidResponse("submit response missing prompt_id".into())
        })?;
        debug!(job_id = %queued.prompt_id, "workflow queued");
        Ok(queued.prompt_id)
    }

    /// Fetch the execution history for a job. A job id the engine does not
    /// know yet (still running, or never seen) yields the empty record.
    pub async fn fetch_history(&self, job_id: &str) -> Result<HistoryRecord> {
        let url = format!("{}/history/{}", self.base_url, job_id);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let resp = require_success(resp).await?;

        let mut records: HashMap<String, HistoryRecord> =
            resp.json().await.map_err(|e| EngineError::Network {
                context: "failed to parse history response".into(),
                source: e,
            })?;
        Ok(records.remove(job_id).unwrap_or_default())
    }

    /// Download one artifact's raw bytes. Artifacts are never cached; every
    /// call re-downloads.
    pub async fn download_artifact(&self, artifact: &ArtifactRef) -> Result<Vec<u8>> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/view", self.base_url),
            &[
                ("filename", artifact.filename.as_str()),
                ("subfolder", artifact.subfolder.as_str()),
                ("type", artifact.kind.as_str()),
            ],
        )
        .map_err(|e| EngineError::InvalidResponse(format!("bad artifact URL: {e}")))?;

        let resp = self
            .http
            .get(url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        let resp = require_success(resp).await?;

        let bytes = resp.bytes().await.map_err(|e| EngineError::Network {
            context: format!("failed to read artifact {}", artifact.filename),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }

    // ---- Job Tracker ----

    /// Wait until the tracked job reaches a terminal state, then return its
    /// history.
    ///
    /// Opens one push-channel connection scoped to this client's session id
    /// and owns it for the duration of the wait. Events for other jobs are
    /// ignored. Terminal conditions:
    ///
    /// * `executing` with a null node and this job's id: success, history is
    ///   fetched and returned;
    /// * `execution_error` with this job's id: [`EngineError::Execution`]
    ///   with the engine's payload;
    /// * `timeout` elapsed (a hard local deadline covering connect and all
    ///   receives): [`EngineError::Timeout`];
    /// * the channel drops mid-wait: [`EngineError::ChannelClosed`] or
    ///   [`EngineError::Channel`]. There is no resumption; the caller decides
    ///   whether to resubmit (resubmission runs a new job).
    ///
    /// The returned future is drop-cancelable: dropping it (for example from
    /// a `select!` against a user abort) closes the channel connection. The
    /// engine-side job keeps running; there is no cancel protocol.
    pub async fn await_completion(&self, job_id: &str, timeout: Duration) -> Result<HistoryRecord> {
        let deadline = Instant::now() + timeout;
        let url = self.channel_url();

        let (mut channel, _) = tokio::time::timeout_at(deadline, connect_async(&url))
            .await
            .map_err(|_| EngineError::Timeout(timeout))??;
        debug!(job_id, session_id = %self.session_id, "push channel open");

        loop {
            let frame = match tokio::time::timeout_at(deadline, channel.next()).await {
                Err(_) => return Err(EngineError::Timeout(timeout)),
                Ok(None) => return Err(EngineError::ChannelClosed),
                Ok(Some(Err(e))) => return Err(EngineError::Channel(e)),
                Ok(Some(Ok(frame))) => frame,
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Close(_) => return Err(EngineError::ChannelClosed),
                // Binary frames carry node previews; ping/pong is handled by
                // the library.
                _ => continue,
            };

            let event = match parse_event(&text) {
                Ok(event) => event,
                Err(err) => {
                    trace!(%err, "skipping unrecognized push frame");
                    continue;
                }
            };

            match event {
                PushEvent::Executing(data)
                    if data.node.is_none() && data.prompt_id.as_deref() == Some(job_id) =>
                {
                    info!(job_id, "job reached terminal state");
                    drop(channel);
                    return self.fetch_history(job_id).await;
                }
                PushEvent::ExecutionError(payload) if error_job_id(&payload) == Some(job_id) => {
                    warn!(job_id, "engine reported execution error");
                    return Err(EngineError::Execution { payload });
                }
                other => trace!(job_id, event = ?other, "ignoring push event"),
            }
        }
    }

    // ---- Result Materializer ----

    /// Download every artifact the history record references, in node-id
    /// order then listed order. An empty record yields an empty vector: the
    /// job completed but produced nothing. The first failed download aborts
    /// the collection.
    pub async fn collect_artifacts(&self, history: &HistoryRecord) -> Result<Vec<Vec<u8>>> {
        let mut artifacts = Vec::new();
        for reference in history.artifacts() {
            artifacts.push(self.download_artifact(reference).await?);
        }
        debug!(count = artifacts.len(), "artifacts collected");
        Ok(artifacts)
    }

    /// Submit a graph, wait for it to finish, and download its artifacts.
    pub async fn generate(&self, graph: &WorkflowGraph, timeout: Duration) -> Result<Vec<Vec<u8>>> {
        let job_id = self.submit(graph).await?;
        let history = self.await_completion(&job_id, timeout).await?;
        self.collect_artifacts(&history).await
    }

    fn unreachable(&self, source: reqwest::Error) -> EngineError {
        EngineError::Network {
            context: format!("cannot reach engine at {}", self.base_url),
            source,
        }
    }
}

async fn require_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(EngineError::Transport {
        status: status.as_u16(),
        body,
    })
}
