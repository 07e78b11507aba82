use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::ProbeError;

/// Reads the playable length of a media URL.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration(&self, url: &str) -> Result<f64, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeJson {
    format: Option<FfprobeFormat>,
}

/// Duration from `ffprobe -show_entries format=duration -of json` output.
pub fn parse_duration(url: &str, stdout: &[u8]) -> Result<f64, ProbeError> {
    let parsed: FfprobeJson = serde_json::from_slice(stdout).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let raw = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| ProbeError::NoDuration(url.to_string()))?;
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ProbeError::Parse(format!("duration `{raw}`")))?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(ProbeError::NoDuration(url.to_string()))
    }
}

/// Probes with the `ffprobe` binary, which reads http URLs directly.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProbe {
    binary: Option<PathBuf>,
}

impl FfprobeProbe {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn binary(&self) -> Result<PathBuf, ProbeError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("ffprobe").map_err(|_| ProbeError::FfprobeMissing),
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration(&self, url: &str) -> Result<f64, ProbeError> {
        let ffprobe = self.binary()?;
        debug!(url, ffprobe = %ffprobe.display(), "probing duration");
        let out = Command::new(ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("json")
            .arg(url)
            .output()
            .await
            .map_err(|e| ProbeError::FfprobeFailed(e.to_string()))?;
        if !out.status.success() {
            return Err(ProbeError::FfprobeFailed(String::from_utf8_lossy(&out.stderr).into()));
        }
        parse_duration(url, &out.stdout)
    }
}
