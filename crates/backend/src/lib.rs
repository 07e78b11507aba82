//! Client side of the studio backend: tree storage, node creation, asset
//! upload, stitching and the planning agent, plus media duration probing.
use async_trait::async_trait;
use timeline::StitchRequest;
use workflow::TreeSnapshot;

mod api;
pub use api::*;
mod config;
pub use config::*;
mod error;
pub use error::*;
mod http;
pub use http::HttpBackend;
mod probe;
pub use probe::*;

/// Every call the studio makes to the backend. Tree-mutating calls answer
/// with the whole updated tree.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// `GET /api/trees/{tree_id}`
    async fn fetch_tree(&self, tree_id: i64) -> Result<TreeSnapshot, BackendError>;

    /// `POST /api/nodes`
    async fn create_node(&self, request: &CreateNodeRequest) -> Result<TreeSnapshot, BackendError>;

    /// `POST /api/assets/upload`, multipart field `file`.
    async fn upload_asset(&self, upload: AssetUpload) -> Result<TreeSnapshot, BackendError>;

    /// `DELETE /api/nodes/{node_id}`; the server removes the whole subtree.
    async fn delete_node(&self, node_id: &str) -> Result<(), BackendError>;

    /// `POST /api/stitch`
    async fn stitch(&self, request: &StitchRequest) -> Result<StitchResponse, BackendError>;

    /// `POST /api/agents/process`
    async fn process_agent(&self, request: &AgentRequest) -> Result<AgentResult, BackendError>;
}
