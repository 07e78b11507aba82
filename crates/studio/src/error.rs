use backend::{BackendError, ProbeError};
use thiserror::Error;
use timeline::TimelineError;
use workflow::{PreconditionError, TreeError};

#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("tree decode failed: {0}")]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Timeline(TimelineError),
    #[error("failed to add clip: {0}")]
    Probe(#[from] ProbeError),
    #[error("cancelled")]
    Cancelled,
    #[error("no clips queued for stitching")]
    NoClips,
    #[error("clip for node {node_id} rejected: {reason}")]
    ClipRejected { node_id: String, reason: String },
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("no agent result to create a node from")]
    NoAgentContext,
    #[error("no generation form is open")]
    NoForm,
}

impl From<TimelineError> for StudioError {
    fn from(err: TimelineError) -> Self {
        match err {
            TimelineError::NoClips => Self::NoClips,
            TimelineError::DuplicateClip(node_id, track) => Self::ClipRejected {
                node_id,
                reason: format!("already on the {track} track"),
            },
            other => Self::Timeline(other),
        }
    }
}

impl StudioError {
    /// Rejections caught before any request goes out; they are not system
    /// errors and log at warn.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::Timeline(_) | Self::NoClips | Self::ClipRejected { .. } | Self::NoAgentContext | Self::NoForm | Self::UnknownNode(_)
        )
    }
}
