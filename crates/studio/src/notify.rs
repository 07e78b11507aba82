/// User-facing side channel of the studio: blocking alerts and yes/no
/// confirmations.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);

    fn confirm(&self, message: &str) -> bool;
}

/// Message shown before a node and its subtree are deleted.
pub fn delete_confirmation(node_id: &str) -> String {
    format!(
        "Delete node {}?\n\nThis also deletes every node that depends on it.",
        short_id(node_id)
    )
}

/// First 8 characters of an id, for status lines.
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(i, _)| &id[..i])
}
