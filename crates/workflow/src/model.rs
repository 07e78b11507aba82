use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CardKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

/// Media lists of one side of a node's assets. Paths are backend-relative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSet {
    #[serde(default, deserialize_with = "crate::wire::string_list")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "crate::wire::string_list")]
    pub videos: Vec<String>,
    #[serde(default, deserialize_with = "crate::wire::string_list")]
    pub audio: Vec<String>,
}

/// Paths the backend sometimes files under `images` although they are video.
pub fn looks_like_video(path: &str) -> bool {
    path.contains(".mp4") || path.contains("subfolder=video")
}

pub fn looks_like_audio(path: &str) -> bool {
    path.contains(".mp3") || path.contains(".wav") || path.contains("subfolder=audio")
}

impl MediaSet {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.audio.is_empty()
    }

    /// First playable item: videos first, then audio, then images.
    pub fn first(&self) -> Option<MediaRef> {
        if let Some(path) = self.videos.iter().find(|p| !p.is_empty()) {
            return Some(MediaRef::new(path, MediaKind::Video));
        }
        if let Some(path) = self.audio.iter().find(|p| !p.is_empty()) {
            return Some(MediaRef::new(path, MediaKind::Audio));
        }
        self.images.iter().find(|p| !p.is_empty()).map(|path| {
            let kind = if looks_like_video(path) {
                MediaKind::Video
            } else {
                MediaKind::Image
            };
            MediaRef::new(path, kind)
        })
    }

    /// Every item in display order: videos before images, audio last.
    pub fn all(&self) -> Vec<MediaRef> {
        let videos = self.videos.iter().map(|p| MediaRef::new(p, MediaKind::Video));
        let images = self.images.iter().map(|p| {
            let kind = if looks_like_video(p) {
                MediaKind::Video
            } else {
                MediaKind::Image
            };
            MediaRef::new(p, kind)
        });
        let mut items: Vec<MediaRef> = videos.collect();
        let (more_videos, stills): (Vec<MediaRef>, Vec<MediaRef>) =
            images.partition(|m| m.kind == MediaKind::Video);
        items.extend(more_videos);
        items.extend(stills);
        items.extend(self.audio.iter().map(|p| MediaRef::new(p, MediaKind::Audio)));
        items.retain(|m| !m.path.is_empty());
        items
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAssets {
    #[serde(default)]
    pub input: MediaSet,
    #[serde(default)]
    pub output: MediaSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub path: String,
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn new(path: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn url(&self, media_base: &str) -> String {
        resolve_media_url(media_base, &self.path)
    }
}

/// Absolute URLs pass through; anything else is joined onto the media base.
pub fn resolve_media_url(media_base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = media_base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// One node of the generation tree after decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    /// Zero, one, or two parents. Only the first shapes the hierarchy.
    pub parents: Vec<String>,
    pub module_id: String,
    pub parameters: Map<String, Value>,
    pub assets: NodeAssets,
    pub status: String,
    pub created_at: String,
    pub tree_id: Option<i64>,
    pub kind: CardKind,
    /// Summary media shown on the card.
    pub media: Option<MediaRef>,
    pub collapsed: bool,
    pub display_name: Option<String>,
    /// User-resized card height.
    pub card_height: Option<f64>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn primary_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Parent the incoming link is drawn from: the second one when present.
    pub fn link_source(&self) -> Option<&str> {
        self.parents.get(1).or_else(|| self.parents.first()).map(String::as_str)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Prompt text shown on the card: `positive_prompt`, else `text`.
    pub fn prompt_text(&self) -> Option<&str> {
        self.param_str("positive_prompt")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.param_str("text"))
            .filter(|s| !s.trim().is_empty())
    }

    pub fn has_prompt(&self) -> bool {
        self.prompt_text().is_some()
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Client-only flags that survive a tree replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFlags {
    pub collapsed: bool,
    pub display_name: Option<String>,
    pub card_height: Option<f64>,
}

impl ClientFlags {
    pub fn of(node: &Node) -> Self {
        Self {
            collapsed: node.collapsed,
            display_name: node.display_name.clone(),
            card_height: node.card_height,
        }
    }

    pub fn apply(self, node: &mut Node) {
        node.collapsed = self.collapsed;
        node.display_name = self.display_name;
        node.card_height = self.card_height;
    }
}

/// Copies client flags from `old` onto nodes of `new` with the same id.
pub fn carry_client_flags(old: &[Node], new: &mut [Node]) {
    for node in new.iter_mut() {
        if let Some(prev) = old.iter().find(|n| n.id == node.id) {
            ClientFlags::of(prev).apply(node);
        }
    }
}

/// The node without parents.
pub fn find_root(nodes: &[Node]) -> Option<&Node> {
    nodes.iter().find(|n| n.is_root())
}
