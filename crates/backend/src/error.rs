use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Http { url: String, status: u16, body: String },
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
    #[error(transparent)]
    Decode(#[from] workflow::TreeError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Response text to show the user next to the failure.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe not found on PATH; please install FFmpeg (ffprobe)")]
    FfprobeMissing,
    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),
    #[error("no duration in probe output for {0}")]
    NoDuration(String),
    #[error("parse error: {0}")]
    Parse(String),
}
