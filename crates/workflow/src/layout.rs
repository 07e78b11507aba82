use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use tracing::warn;

use crate::{CardKind, Edge, Node};

/// Vertical gap between cards of the same rank.
pub const NODE_SEP: f64 = 100.0;
/// Horizontal gap between ranks.
pub const RANK_SEP: f64 = 120.0;

pub const CARD_WIDTH: f64 = 260.0;
pub const MIN_CARD_HEIGHT: f64 = 140.0;
pub const MAX_CARD_HEIGHT: f64 = 480.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardSize {
    pub width: f64,
    pub height: f64,
}

impl CardSize {
    const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

pub fn clamp_card_height(height: f64) -> f64 {
    if height.is_finite() {
        height.clamp(MIN_CARD_HEIGHT, MAX_CARD_HEIGHT)
    } else {
        MIN_CARD_HEIGHT
    }
}

/// Fixed size per card kind and content. Generic cards honour a
/// user-resized height.
pub fn card_size(node: &Node) -> CardSize {
    match node.kind {
        CardKind::Root => CardSize::new(60.0, 60.0),
        CardKind::IntentDraft => CardSize::new(CARD_WIDTH, 150.0),
        CardKind::WorkflowPlanning => CardSize::new(CARD_WIDTH, 180.0),
        CardKind::Audio => CardSize::new(CARD_WIDTH, 90.0),
        CardKind::ImageText => CardSize::new(CARD_WIDTH, 140.0),
        CardKind::Generic => {
            let height = match (node.has_media(), node.has_prompt()) {
                (false, false) => 120.0,
                (false, true) => 150.0,
                (true, false) => 180.0,
                (true, true) => 200.0,
            };
            CardSize::new(CARD_WIDTH, node.card_height.map_or(height, clamp_card_height))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Card placement; `x`/`y` is the card centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedNode {
    pub id: String,
    #[serde(flatten)]
    pub rect: NodeBox,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePath {
    pub source: String,
    pub target: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphLayout {
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<EdgePath>,
    pub width: f64,
    pub height: f64,
}

impl GraphLayout {
    pub fn get(&self, id: &str) -> Option<&NodeBox> {
        self.nodes.iter().find(|n| n.id == id).map(|n| &n.rect)
    }
}

/// Assigns positions to sized nodes. Swappable so a renderer can bring its
/// own graph layout.
pub trait LayoutEngine: Send + Sync {
    fn layout(&self, nodes: &[(String, CardSize)], edges: &[Edge]) -> GraphLayout;
}

/// Left-to-right layered layout: longest-path ranks, barycentre ordering
/// inside a rank, ranks centred vertically.
#[derive(Debug, Clone, Copy)]
pub struct LayeredLayout {
    pub node_sep: f64,
    pub rank_sep: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            node_sep: NODE_SEP,
            rank_sep: RANK_SEP,
        }
    }
}

impl LayeredLayout {
    fn ranks(graph: &DiGraph<usize, ()>) -> (Vec<NodeIndex>, Vec<usize>) {
        let order = match toposort(graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                warn!(node = cycle.node_id().index(), "cycle in tree, ranking in input order");
                graph.node_indices().collect()
            }
        };
        let mut position = vec![0usize; graph.node_count()];
        for (i, ix) in order.iter().enumerate() {
            position[ix.index()] = i;
        }
        let mut rank = vec![0usize; graph.node_count()];
        for &ix in &order {
            let r = graph
                .neighbors_directed(ix, Direction::Incoming)
                .filter(|p| position[p.index()] < position[ix.index()])
                .map(|p| rank[p.index()] + 1)
                .max()
                .unwrap_or(0);
            rank[ix.index()] = r;
        }
        (order, rank)
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, nodes: &[(String, CardSize)], edges: &[Edge]) -> GraphLayout {
        if nodes.is_empty() {
            return GraphLayout::default();
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut by_id: HashMap<&str, NodeIndex> = HashMap::with_capacity(nodes.len());
        for (i, (id, _)) in nodes.iter().enumerate() {
            by_id.insert(id.as_str(), graph.add_node(i));
        }
        let mut kept_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            let (Some(&s), Some(&t)) = (by_id.get(edge.source.as_str()), by_id.get(edge.target.as_str())) else {
                continue;
            };
            if s != t {
                graph.add_edge(s, t, ());
                kept_edges.push((edge, s, t));
            }
        }

        let (_, rank) = Self::ranks(&graph);
        let rank_count = rank.iter().copied().max().unwrap_or(0) + 1;

        // order inside each rank, rank 0 in input order
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for i in 0..nodes.len() {
            layers[rank[i]].push(i);
        }
        let mut slot = vec![0.0f64; nodes.len()];
        for layer in layers.iter_mut() {
            let mut keyed: Vec<(f64, usize)> = layer
                .iter()
                .map(|&i| {
                    let preds: Vec<f64> = graph
                        .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                        .filter(|p| rank[p.index()] < rank[i])
                        .map(|p| slot[p.index()])
                        .collect();
                    let key = if preds.is_empty() {
                        f64::MAX
                    } else {
                        preds.iter().sum::<f64>() / preds.len() as f64
                    };
                    (key, i)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            *layer = keyed.into_iter().map(|(_, i)| i).collect();
            for (pos, &i) in layer.iter().enumerate() {
                slot[i] = pos as f64;
            }
        }

        let stack_height = |layer: &[usize]| {
            let cards: f64 = layer.iter().map(|&i| nodes[i].1.height).sum();
            cards + self.node_sep * layer.len().saturating_sub(1) as f64
        };
        let height = layers.iter().map(|l| stack_height(l.as_slice())).fold(0.0, f64::max);

        let mut placed: Vec<Option<PlacedNode>> = vec![None; nodes.len()];
        let mut x_cursor = 0.0;
        for (r, layer) in layers.iter().enumerate() {
            let rank_width = layer.iter().map(|&i| nodes[i].1.width).fold(0.0, f64::max);
            let mut y_cursor = (height - stack_height(layer.as_slice())) / 2.0;
            for &i in layer {
                let (id, size) = &nodes[i];
                placed[i] = Some(PlacedNode {
                    id: id.clone(),
                    rect: NodeBox {
                        x: x_cursor + rank_width / 2.0,
                        y: y_cursor + size.height / 2.0,
                        width: size.width,
                        height: size.height,
                    },
                    rank: r,
                });
                y_cursor += size.height + self.node_sep;
            }
            x_cursor += rank_width;
            if r + 1 < rank_count {
                x_cursor += self.rank_sep;
            }
        }
        let placed: Vec<PlacedNode> = placed.into_iter().flatten().collect();

        let edges = kept_edges
            .into_iter()
            .map(|(edge, s, t)| {
                let a = placed[s.index()].rect;
                let b = placed[t.index()].rect;
                let start = Point {
                    x: a.x + a.width / 2.0,
                    y: a.y,
                };
                let end = Point {
                    x: b.x - b.width / 2.0,
                    y: b.y,
                };
                let mid = Point {
                    x: (start.x + end.x) / 2.0,
                    y: (start.y + end.y) / 2.0,
                };
                EdgePath {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    points: vec![start, mid, end],
                }
            })
            .collect();

        GraphLayout {
            nodes: placed,
            edges,
            width: x_cursor,
            height,
        }
    }
}
