use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::Node;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct Visible<'a> {
    pub nodes: Vec<&'a Node>,
    pub edges: Vec<Edge>,
}

impl Visible<'_> {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }
}

/// Children keyed by primary parent, in node order.
pub fn child_index(nodes: &[Node]) -> HashMap<&str, Vec<&str>> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.primary_parent() {
            children.entry(parent).or_default().push(node.id.as_str());
        }
    }
    children
}

pub fn has_children(index: &HashMap<&str, Vec<&str>>, id: &str) -> bool {
    index.get(id).is_some_and(|c| !c.is_empty())
}

/// Transitive descendants of `id` over the primary-parent hierarchy.
pub fn descendants<'a>(index: &HashMap<&'a str, Vec<&'a str>>, id: &str) -> HashSet<&'a str> {
    let mut out = HashSet::new();
    let mut stack: Vec<&str> = index.get(id).cloned().unwrap_or_default();
    while let Some(next) = stack.pop() {
        if out.insert(next) {
            if let Some(children) = index.get(next) {
                stack.extend(children.iter().copied());
            }
        }
    }
    out
}

/// Hides the descendants of every collapsed node. A collapsed node stays
/// visible itself. Each node contributes at most one incoming edge, drawn
/// from [`Node::link_source`]; edges to unknown or hidden nodes are dropped.
pub fn resolve(nodes: &[Node]) -> Visible<'_> {
    let index = child_index(nodes);
    let mut hidden: HashSet<&str> = HashSet::new();
    for node in nodes.iter().filter(|n| n.collapsed) {
        hidden.extend(descendants(&index, &node.id));
    }

    let visible: Vec<&Node> = nodes.iter().filter(|n| !hidden.contains(n.id.as_str())).collect();
    let visible_ids: HashSet<&str> = visible.iter().map(|n| n.id.as_str()).collect();

    let edges = visible
        .iter()
        .filter_map(|n| {
            let source = n.link_source()?;
            visible_ids.contains(source).then(|| Edge {
                source: source.to_string(),
                target: n.id.clone(),
            })
        })
        .collect();

    Visible {
        nodes: visible,
        edges,
    }
}
