use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use workflow::{NodeView, OperationSpec, ParentRequirement, TreeView};

/// Indented outline of the visible tree, one card per line.
pub fn tree_text(view: &TreeView) -> String {
    if view.nodes.is_empty() {
        return "(empty tree)\n".to_string();
    }
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut targets = HashSet::new();
    for edge in &view.edges {
        children.entry(edge.source.as_str()).or_default().push(edge.target.as_str());
        targets.insert(edge.target.as_str());
    }
    // Each node has at most one incoming edge; a merge node prints under its second parent.
    let mut printed = HashSet::new();
    let mut out = String::new();
    for node in view.nodes.iter().filter(|n| !targets.contains(n.id.as_str())) {
        write_node(view, &children, node, 0, &mut printed, &mut out);
    }
    out
}

fn write_node<'a>(
    view: &'a TreeView,
    children: &HashMap<&str, Vec<&'a str>>,
    node: &'a NodeView,
    depth: usize,
    printed: &mut HashSet<&'a str>,
    out: &mut String,
) {
    if !printed.insert(node.id.as_str()) {
        return;
    }
    let chrome = &node.chrome;
    let marker = if chrome.selected { "*" } else { "-" };
    let toggle = match chrome.collapse_toggle {
        Some(true) => " [+]",
        Some(false) => " [-]",
        None => "",
    };
    let running = if chrome.running { " (running)" } else { "" };
    let _ = writeln!(
        out,
        "{:indent$}{marker} {} {}{toggle}{running}  {}",
        "",
        node.id,
        chrome.title,
        chrome.tooltip,
        indent = depth * 2
    );
    for child in children.get(node.id.as_str()).into_iter().flatten() {
        if let Some(child) = view.get(child) {
            write_node(view, children, child, depth + 1, printed, out);
        }
    }
}

pub fn modules_text<'a>(ops: impl IntoIterator<Item = &'a OperationSpec>) -> String {
    let mut out = String::new();
    for op in ops {
        let parents = match op.parents {
            ParentRequirement::Any => "any",
            ParentRequirement::AtLeastOne => "1+",
            ParentRequirement::ExactlyTwo => "2",
        };
        let params: Vec<&str> = op.params.iter().map(|p| p.id).collect();
        let _ = writeln!(
            out,
            "{:<26} {:<22} {:<10} parents={:<3} {}",
            op.id,
            op.name,
            op.category.as_str(),
            parents,
            params.join(",")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow::{normalize, project, LayeredLayout, Selection, TreeSnapshot, Viewport};

    fn view(value: serde_json::Value, selected: &[&str]) -> TreeView {
        let snapshot: TreeSnapshot = serde_json::from_value(value).unwrap();
        let nodes = normalize(snapshot.nodes).unwrap();
        let mut viewport = Viewport::new(800.0, 600.0);
        project(
            &nodes,
            &Selection::from_ids(selected.iter().copied()),
            &LayeredLayout::default(),
            &mut viewport,
            "http://m",
        )
    }

    #[test]
    fn test_tree_text_indents_children() {
        let view = view(
            serde_json::json!({"nodes": [
                {"node_id": "r", "parent_id": null, "module_id": "Init"},
                {"node_id": "a", "parent_id": "r", "module_id": "TextGenerateImage"},
                {"node_id": "b", "parent_id": "a", "module_id": "ImageCanny"}
            ]}),
            &["a"],
        );
        let text = tree_text(&view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("- r Init [-]"));
        assert!(lines[1].starts_with("  * a "));
        assert!(lines[2].starts_with("    - b "));
    }

    #[test]
    fn test_merge_node_prints_under_second_parent() {
        let view = view(
            serde_json::json!({"nodes": [
                {"node_id": "r", "parent_id": null, "module_id": "Init"},
                {"node_id": "a", "parent_id": "r", "module_id": "TextGenerateImage"},
                {"node_id": "b", "parent_id": "r", "module_id": "TextGenerateImage"},
                {"node_id": "m", "parent_id": ["a", "b"], "module_id": "ImageMerging"}
            ]}),
            &[],
        );
        let text = tree_text(&view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        let b = lines.iter().position(|l| l.starts_with("  - b ")).unwrap();
        assert!(lines[b + 1].starts_with("    - m "));
        assert_eq!(lines.iter().filter(|l| l.contains(" m ")).count(), 1);
    }

    #[test]
    fn test_empty_tree_text() {
        assert_eq!(tree_text(&TreeView::default()), "(empty tree)\n");
    }

    #[test]
    fn test_modules_text_lists_requirements() {
        let text = modules_text(workflow::operation("ImageMerging"));
        assert!(text.starts_with("ImageMerging"));
        assert!(text.contains("parents=2"));
    }
}
