use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::BackendError;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000";

pub const ENV_API_BASE: &str = "STUDIO_API_BASE";
pub const ENV_MEDIA_BASE: &str = "STUDIO_MEDIA_BASE";
pub const ENV_TREE_ID: &str = "STUDIO_TREE_ID";

/// Where the backend lives and which tree to work on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the REST API.
    pub api_base: String,

    /// Base URL media paths are resolved against; the API base when unset.
    pub media_base: Option<String>,

    pub tree_id: i64,

    /// Seconds an image clip shows for when first added.
    pub default_image_duration: f64,

    /// Explicit ffprobe binary; looked up on PATH otherwise.
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            media_base: None,
            tree_id: 1,
            default_image_duration: timeline::DEFAULT_IMAGE_DURATION,
            ffprobe_path: None,
        }
    }
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn with_media_base(mut self, url: impl Into<String>) -> Self {
        self.media_base = Some(url.into());
        self
    }

    pub fn with_tree_id(mut self, tree_id: i64) -> Self {
        self.tree_id = tree_id;
        self
    }

    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = Some(path.into());
        self
    }

    pub fn media_base(&self) -> &str {
        self.media_base.as_deref().unwrap_or(&self.api_base)
    }

    /// `api_base` joined with `path`, without doubled slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Applies `STUDIO_*` overrides from `lookup`; a tree id that does not
    /// parse is ignored with a warning.
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_API_BASE) {
            self.api_base = v;
        }
        if let Some(v) = lookup(ENV_MEDIA_BASE) {
            self.media_base = Some(v);
        }
        if let Some(v) = lookup(ENV_TREE_ID) {
            match v.trim().parse() {
                Ok(id) => self.tree_id = id,
                Err(_) => tracing::warn!(value = %v, "ignoring non-numeric {ENV_TREE_ID}"),
            }
        }
        self
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<(), BackendError> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::from)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json).map_err(std::io::Error::from)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_and_media_base() {
        let config = BackendConfig::new()
            .with_api_base("http://api:5000/")
            .with_tree_id(7);
        assert_eq!(config.media_base(), "http://api:5000/");
        assert_eq!(config.endpoint("/api/nodes"), "http://api:5000/api/nodes");
        assert_eq!(config.tree_id, 7);

        let config = config.with_media_base("http://cdn");
        assert_eq!(config.media_base(), "http://cdn");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_API_BASE, "http://env:1"), (ENV_TREE_ID, "42")].into();
        let config = BackendConfig::default().apply_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_base, "http://env:1");
        assert_eq!(config.tree_id, 42);
        assert_eq!(config.media_base, None);

        let bad = BackendConfig::default().apply_env_with(|k| (k == ENV_TREE_ID).then(|| "x".to_string()));
        assert_eq!(bad.tree_id, 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        let config = BackendConfig::new().with_tree_id(3).with_ffprobe_path("/usr/bin/ffprobe");
        config.save(&path).unwrap();
        assert_eq!(BackendConfig::load(&path).unwrap(), config);

        std::fs::write(&path, r#"{"tree_id": 9}"#).unwrap();
        let partial = BackendConfig::load(&path).unwrap();
        assert_eq!(partial.tree_id, 9);
        assert_eq!(partial.api_base, DEFAULT_API_BASE);
    }
}
