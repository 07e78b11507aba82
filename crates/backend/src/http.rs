use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use workflow::TreeSnapshot;

use crate::{
    AgentEnvelope, AgentRequest, AgentResult, AssetUpload, BackendConfig, BackendError, CreateNodeRequest,
    StitchResponse, WorkflowBackend,
};
use timeline::StitchRequest;

/// [`WorkflowBackend`] over the studio REST API. No client timeout is set;
/// requests run until the server answers or the transport fails.
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| BackendError::Transport {
                url: config.api_base.clone(),
                source,
            })?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Sends the request and returns the body of a 2xx reply. Anything else
    /// carries the response text.
    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let transport = |source| BackendError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(BackendError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.send(url, request).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Tree replies must carry a `nodes` field, even when empty.
    async fn send_tree(&self, url: &str, request: reqwest::RequestBuilder) -> Result<TreeSnapshot, BackendError> {
        let value: Value = self.send_json(url, request).await?;
        let malformed = |reason: String| BackendError::Malformed {
            url: url.to_string(),
            reason,
        };
        if value.get("nodes").is_none() {
            return Err(malformed("missing `nodes`".to_string()));
        }
        let snapshot: TreeSnapshot = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
        debug!(url, nodes = snapshot.nodes.len(), "tree received");
        Ok(snapshot)
    }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    async fn fetch_tree(&self, tree_id: i64) -> Result<TreeSnapshot, BackendError> {
        let url = self.config.endpoint(&format!("/api/trees/{tree_id}"));
        self.send_tree(&url, self.client.get(&url)).await
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<TreeSnapshot, BackendError> {
        let url = self.config.endpoint("/api/nodes");
        info!(module = %request.module_id, parents = ?request.parent_ids, "creating node");
        self.send_tree(&url, self.client.post(&url).json(request)).await
    }

    async fn upload_asset(&self, upload: AssetUpload) -> Result<TreeSnapshot, BackendError> {
        let url = self.config.endpoint("/api/assets/upload");
        info!(file = %upload.file_name, bytes = upload.bytes.len(), "uploading asset");
        let query = upload.query();
        let part = Part::bytes(upload.bytes).file_name(upload.file_name);
        let form = Form::new().part("file", part);
        self.send_tree(&url, self.client.post(&url).query(&query).multipart(form))
            .await
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), BackendError> {
        let url = self.config.endpoint(&format!("/api/nodes/{node_id}"));
        info!(node_id, "deleting node");
        self.send(&url, self.client.delete(&url)).await?;
        Ok(())
    }

    async fn stitch(&self, request: &StitchRequest) -> Result<StitchResponse, BackendError> {
        let url = self.config.endpoint("/api/stitch");
        info!(
            clips = request.clips.len(),
            audio_clips = request.audio_clips.len(),
            "requesting stitch"
        );
        let response: StitchResponse = self.send_json(&url, self.client.post(&url).json(request)).await?;
        if response.output_url.trim().is_empty() {
            return Err(BackendError::Malformed {
                url,
                reason: "empty `output_url`".to_string(),
            });
        }
        Ok(response)
    }

    async fn process_agent(&self, request: &AgentRequest) -> Result<AgentResult, BackendError> {
        let url = self.config.endpoint("/api/agents/process");
        info!(node_id = %request.node_id, "invoking agent");
        let envelope: AgentEnvelope = self.send_json(&url, self.client.post(&url).json(request)).await?;
        envelope.into_result(&url)
    }
}
