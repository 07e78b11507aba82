use serde::Serialize;

use crate::{
    card_chrome, card_size, child_index, has_children, link_color, resolve, CardChrome, CardKind, GenericCardEditor,
    LayoutEngine, MediaKind, MediaPicker, MediaRef, Node, NodeBox, ParamField, Phrase, Point, Selection,
    ViewTransform, Viewport,
};

/// Input thumbnails shown on a generic card.
pub const MAX_INPUT_THUMBNAILS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaView {
    pub url: String,
    pub kind: MediaKind,
}

impl MediaView {
    fn of(media: &MediaRef, media_base: &str) -> Self {
        Self {
            url: media.url(media_base),
            kind: media.kind,
        }
    }
}

/// What goes inside a card, per card kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardContent {
    Root,
    IntentDraft {
        text: String,
    },
    WorkflowPlanning {
        text: String,
        gallery: Vec<MediaView>,
    },
    Audio {
        text: String,
        audio: Option<MediaView>,
        can_add_clip: bool,
    },
    ImageText {
        text: String,
        media: Option<MediaView>,
    },
    Generic {
        positive: Vec<Phrase>,
        negative: Option<Vec<Phrase>>,
        inputs: Vec<MediaView>,
        params: Vec<ParamField>,
        outputs: Vec<MediaView>,
    },
}

fn content(node: &Node, media_base: &str) -> CardContent {
    let text = node.param_str("text").unwrap_or_default().to_string();
    match node.kind {
        CardKind::Root => CardContent::Root,
        CardKind::IntentDraft => CardContent::IntentDraft { text },
        CardKind::WorkflowPlanning => CardContent::WorkflowPlanning {
            text,
            gallery: crate::PlanningCard::from_node(node)
                .gallery()
                .iter()
                .map(|m| MediaView::of(m, media_base))
                .collect(),
        },
        CardKind::Audio => {
            let audio = node
                .media
                .as_ref()
                .filter(|m| m.kind == MediaKind::Audio)
                .map(|m| MediaView::of(m, media_base));
            CardContent::Audio {
                text,
                can_add_clip: audio.is_some(),
                audio,
            }
        }
        CardKind::ImageText => CardContent::ImageText {
            text,
            media: node
                .assets
                .output
                .first()
                .or_else(|| node.assets.input.first())
                .map(|m| MediaView::of(&m, media_base)),
        },
        CardKind::Generic => {
            let editor = GenericCardEditor::from_node(node);
            CardContent::Generic {
                positive: editor.positive.rows().to_vec(),
                negative: editor.negative.as_ref().map(|n| n.rows().to_vec()),
                inputs: node
                    .assets
                    .input
                    .all()
                    .iter()
                    .filter(|m| m.kind == MediaKind::Image)
                    .take(MAX_INPUT_THUMBNAILS)
                    .map(|m| MediaView::of(m, media_base))
                    .collect(),
                params: editor.fields().to_vec(),
                outputs: MediaPicker::from_node(node)
                    .items()
                    .iter()
                    .map(|m| MediaView::of(m, media_base))
                    .collect(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub kind: CardKind,
    /// World coordinates, centred.
    pub rect: NodeBox,
    pub chrome: CardChrome,
    pub content: CardContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub color: &'static str,
    pub points: Vec<Point>,
}

/// Everything a renderer needs to draw the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TreeView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub width: f64,
    pub height: f64,
    pub transform: ViewTransform,
}

impl TreeView {
    pub fn get(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Card under a screen point, if any.
    pub fn node_at(&self, screen: Point) -> Option<&str> {
        let p = self.transform.invert(screen);
        self.nodes
            .iter()
            .find(|n| {
                (p.x - n.rect.x).abs() <= n.rect.width / 2.0 && (p.y - n.rect.y).abs() <= n.rect.height / 2.0
            })
            .map(|n| n.id.as_str())
    }
}

/// Projects the node list into a drawable view. The viewport keeps its saved
/// transform; only the first projection fits the graph.
pub fn project(
    nodes: &[Node],
    selection: &Selection,
    engine: &dyn LayoutEngine,
    viewport: &mut Viewport,
    media_base: &str,
) -> TreeView {
    let visible = resolve(nodes);
    if visible.nodes.is_empty() {
        return TreeView {
            transform: viewport.saved().unwrap_or_default(),
            ..Default::default()
        };
    }

    let sized: Vec<(String, _)> = visible.nodes.iter().map(|n| (n.id.clone(), card_size(n))).collect();
    let layout = engine.layout(&sized, &visible.edges);
    let transform = viewport.transform_for(&layout);
    let children = child_index(nodes);

    let node_views = visible
        .nodes
        .iter()
        .filter_map(|node| {
            let rect = *layout.get(&node.id)?;
            Some(NodeView {
                id: node.id.clone(),
                kind: node.kind,
                rect,
                chrome: card_chrome(node, has_children(&children, &node.id), selection.contains(&node.id)),
                content: content(node, media_base),
            })
        })
        .collect();

    let edges = layout
        .edges
        .iter()
        .map(|path| {
            let module = visible
                .nodes
                .iter()
                .find(|n| n.id == path.target)
                .map_or("", |n| n.module_id.as_str());
            EdgeView {
                source: path.source.clone(),
                target: path.target.clone(),
                color: link_color(module),
                points: path.points.clone(),
            }
        })
        .collect();

    TreeView {
        nodes: node_views,
        edges,
        width: layout.width,
        height: layout.height,
        transform,
    }
}
