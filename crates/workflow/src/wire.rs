use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{CardKind, MediaSet, Node, NodeAssets, TreeError};

/// `parent_id` as the backend sends it: null, one id, or a list of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentRef {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl ParentRef {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::One(id) if id.is_empty() => Vec::new(),
            Self::One(id) => vec![id],
            Self::Many(ids) => ids.into_iter().filter(|id| !id.is_empty()).collect(),
        }
    }
}

/// A node row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbNode {
    pub node_id: String,
    #[serde(default)]
    pub parent_id: ParentRef,
    #[serde(default)]
    pub tree_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub module_id: String,
    /// JSON-encoded string, inline object, or null.
    #[serde(default)]
    pub parameters: Value,
    /// JSON-encoded string, inline object, or null.
    #[serde(default)]
    pub assets: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
}

/// Full tree as returned by every tree-mutating endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<DbNode>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lenient string list: null becomes empty, non-string entries are skipped.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => Vec::new(),
    })
}

fn decode_object(node_id: &str, field: &'static str, value: Value) -> Result<Map<String, Value>, TreeError> {
    let value = match value {
        Value::Null => return Ok(Map::new()),
        Value::String(s) if s.trim().is_empty() => return Ok(Map::new()),
        Value::String(s) => serde_json::from_str(&s).map_err(|source| TreeError::BadJson {
            node_id: node_id.to_string(),
            field,
            source,
        })?,
        other => other,
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(TreeError::NotAnObject {
            node_id: node_id.to_string(),
            field,
        }),
    }
}

/// Assets come either split into `input`/`output` or as a flat media set,
/// which is taken as output.
fn decode_assets(node_id: &str, value: Value) -> Result<NodeAssets, TreeError> {
    let map = decode_object(node_id, "assets", value)?;
    let bad = |source| TreeError::BadAssets {
        node_id: node_id.to_string(),
        source,
    };
    if map.contains_key("input") || map.contains_key("output") {
        serde_json::from_value(Value::Object(map)).map_err(bad)
    } else {
        let output: MediaSet = serde_json::from_value(Value::Object(map)).map_err(bad)?;
        Ok(NodeAssets {
            input: MediaSet::default(),
            output,
        })
    }
}

impl DbNode {
    pub fn into_node(self) -> Result<Node, TreeError> {
        if self.node_id.is_empty() {
            return Err(TreeError::EmptyId);
        }
        let parameters = decode_object(&self.node_id, "parameters", self.parameters)?;
        let assets = decode_assets(&self.node_id, self.assets)?;
        let parents = self.parent_id.into_vec();
        let kind = CardKind::classify(&parents, &self.module_id);
        let media = assets.output.first();
        Ok(Node {
            id: self.node_id,
            parents,
            module_id: self.module_id,
            parameters,
            assets,
            status: self.status,
            created_at: self.created_at,
            tree_id: self.tree_id,
            kind,
            media,
            collapsed: false,
            display_name: None,
            card_height: None,
        })
    }
}

/// Decodes a whole snapshot. Any malformed node fails the lot.
pub fn normalize(rows: Vec<DbNode>) -> Result<Vec<Node>, TreeError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut nodes = Vec::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.node_id.clone()) {
            return Err(TreeError::DuplicateId(row.node_id));
        }
        nodes.push(row.into_node()?);
    }
    debug!(count = nodes.len(), "tree normalized");
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaKind;
    use serde_json::json;

    fn snapshot(value: Value) -> TreeSnapshot {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parent_id_shapes() {
        let tree = snapshot(json!({"nodes": [
            {"node_id": "r", "parent_id": null, "module_id": "Init"},
            {"node_id": "a", "parent_id": "r", "module_id": "AddText"},
            {"node_id": "m", "parent_id": ["a", "r"], "module_id": "ImageMerging"},
            {"node_id": "e", "parent_id": [], "module_id": "Upload"}
        ]}));
        let nodes = normalize(tree.nodes).unwrap();
        assert!(nodes[0].parents.is_empty());
        assert_eq!(nodes[1].parents, vec!["r"]);
        assert_eq!(nodes[2].parents, vec!["a", "r"]);
        assert!(nodes[3].is_root());
        assert_eq!(nodes[0].kind, CardKind::Root);
        assert_eq!(nodes[1].kind, CardKind::IntentDraft);
    }

    #[test]
    fn test_string_encoded_fields() {
        let tree = snapshot(json!({"nodes": [{
            "node_id": "n1",
            "parent_id": "r",
            "tree_id": 1,
            "module_id": "TextGenerateImage",
            "parameters": "{\"positive_prompt\": \"cat:1.0\"}",
            "assets": "{\"output\": {\"images\": [\"/view?filename=a.png\"]}, \"input\": {\"images\": []}}",
            "status": "success",
            "created_at": "2024-05-01 10:00:00"
        }]}));
        let node = normalize(tree.nodes).unwrap().remove(0);
        assert_eq!(node.param_str("positive_prompt"), Some("cat:1.0"));
        assert_eq!(node.assets.output.images, vec!["/view?filename=a.png"]);
        assert_eq!(node.media.as_ref().unwrap().kind, MediaKind::Image);
        assert_eq!(node.tree_id, Some(1));
    }

    #[test]
    fn test_flat_assets_are_output() {
        let tree = snapshot(json!({"nodes": [{
            "node_id": "n1",
            "parent_id": "r",
            "module_id": "TextToAudio",
            "assets": {"audio": ["/view?subfolder=audio&filename=a.wav"], "images": null}
        }]}));
        let node = normalize(tree.nodes).unwrap().remove(0);
        assert_eq!(node.media.unwrap().kind, MediaKind::Audio);
        assert!(node.assets.input.is_empty());
    }

    #[test]
    fn test_malformed_rows_fail_whole_snapshot() {
        let tree = snapshot(json!({"nodes": [
            {"node_id": "a", "parent_id": null},
            {"node_id": "b", "parent_id": "a", "parameters": "{not json"}
        ]}));
        assert!(matches!(
            normalize(tree.nodes),
            Err(TreeError::BadJson { field: "parameters", .. })
        ));

        let tree = snapshot(json!({"nodes": [
            {"node_id": "a", "parent_id": null},
            {"node_id": "a", "parent_id": null}
        ]}));
        assert!(matches!(normalize(tree.nodes), Err(TreeError::DuplicateId(id)) if id == "a"));

        let tree = snapshot(json!({"nodes": [{"node_id": "a", "parameters": "[1, 2]"}]}));
        assert!(matches!(normalize(tree.nodes), Err(TreeError::NotAnObject { .. })));
    }

    #[test]
    fn test_null_nodes_is_empty() {
        assert!(snapshot(json!({"nodes": null})).nodes.is_empty());
        assert!(snapshot(json!({})).nodes.is_empty());
    }
}
