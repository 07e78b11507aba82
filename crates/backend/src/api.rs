//! Request and response bodies of the studio REST API.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::BackendError;

/// Body of `POST /api/nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    pub tree_id: i64,
    pub parent_ids: Vec<String>,
    pub module_id: String,
    pub parameters: Map<String, Value>,
}

/// A file for `POST /api/assets/upload`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetUpload {
    pub tree_id: i64,
    pub parent_id: Option<String>,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AssetUpload {
    pub async fn from_path(tree_id: i64, parent_id: Option<String>, path: &Path) -> Result<Self, BackendError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            tree_id,
            parent_id,
            file_name,
            bytes,
        })
    }

    /// `tree_id` always, `parent_id` only when there is one.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("tree_id", self.tree_id.to_string())];
        if let Some(parent) = &self.parent_id {
            query.push(("parent_id", parent.clone()));
        }
        query
    }
}

/// Reply of `POST /api/stitch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StitchResponse {
    pub output_url: String,
}

/// Body of `POST /api/agents/process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub user_input: String,
    pub node_id: String,
    pub image_url: Option<String>,
    /// Operation of the node the agent is invoked from.
    pub workflow_context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub workflow_file: String,
    pub card_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub positive: Option<String>,
    pub negative: Option<String>,
    pub text: Option<String>,
}

/// What the agent pipeline suggests for the next node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentResult {
    pub intent: String,
    pub style: String,
    pub knowledge: String,
    pub recommendation: Recommendation,
    pub prompts: AgentPrompts,
}

impl AgentResult {
    /// Operation id named by the recommended workflow file, e.g.
    /// `workflows/TextGenerateImage.json` -> `TextGenerateImage`.
    pub fn recommended_module(&self) -> Option<&str> {
        let file = self.recommendation.workflow_file.trim();
        let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
        let name = name.strip_suffix(".json").unwrap_or(name);
        (!name.is_empty()).then_some(name)
    }
}

/// Envelope the agent endpoint wraps its result in.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    pub data: Option<AgentResult>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentEnvelope {
    pub fn into_result(self, url: &str) -> Result<AgentResult, BackendError> {
        match (self.status.as_deref(), self.data) {
            (None | Some("success"), Some(data)) => Ok(data),
            (status, _) => Err(BackendError::Malformed {
                url: url.to_string(),
                reason: self
                    .message
                    .unwrap_or_else(|| format!("agent status {}", status.unwrap_or("missing"))),
            }),
        }
    }
}
