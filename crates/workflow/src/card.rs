use serde::{Deserialize, Serialize};

use crate::{operation, Category, Node};

/// Card variant of a node, fixed when the node is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Root,
    IntentDraft,
    WorkflowPlanning,
    Audio,
    ImageText,
    Generic,
}

impl CardKind {
    /// First match wins.
    pub fn classify(parents: &[String], module_id: &str) -> Self {
        if parents.is_empty() {
            return Self::Root;
        }
        match module_id {
            "AddText" => Self::IntentDraft,
            "AddWorkflow" => Self::WorkflowPlanning,
            "TextToAudio" => Self::Audio,
            "Upload" | "AddImageText" => Self::ImageText,
            _ => Self::Generic,
        }
    }
}

/// Right-click actions available on every card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAction {
    CreateIntentDraft,
    CreateWorkflowPlanning,
}

impl ContextAction {
    pub const ALL: [ContextAction; 2] = [Self::CreateIntentDraft, Self::CreateWorkflowPlanning];

    pub fn module_id(&self) -> &'static str {
        match self {
            Self::CreateIntentDraft => "AddText",
            Self::CreateWorkflowPlanning => "AddWorkflow",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateIntentDraft => "New intent draft",
            Self::CreateWorkflowPlanning => "New workflow plan",
        }
    }
}

/// A category button that opens the generation form anchored at a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickStart {
    pub category: Category,
    pub module_id: &'static str,
    pub color: &'static str,
}

impl QuickStart {
    fn for_category(category: Category) -> Option<Self> {
        Some(Self {
            category,
            module_id: category.default_module()?,
            color: category.color(),
        })
    }
}

/// Frame around a card's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardChrome {
    pub title: String,
    pub tooltip: String,
    pub running: bool,
    pub selected: bool,
    /// `None` when the node has no children to collapse.
    pub collapse_toggle: Option<bool>,
    pub quick_starts: Vec<QuickStart>,
    pub context_actions: Vec<ContextAction>,
}

pub fn card_title(node: &Node) -> String {
    if let Some(name) = node.display_name.as_deref().filter(|s| !s.trim().is_empty()) {
        return name.to_string();
    }
    if node.kind == CardKind::Root {
        return "Init".to_string();
    }
    operation(&node.module_id).map_or_else(|| node.module_id.clone(), |op| op.name.to_string())
}

/// `module · created_at · status`, skipping empty parts.
pub fn card_tooltip(node: &Node) -> String {
    [node.module_id.as_str(), node.created_at.as_str(), node.status.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" · ")
}

fn quick_starts(kind: CardKind) -> Vec<QuickStart> {
    match kind {
        CardKind::Root => vec![QuickStart {
            category: Category::Utility,
            module_id: "AddText",
            color: Category::Utility.color(),
        }],
        CardKind::Audio => QuickStart::for_category(Category::Audio).into_iter().collect(),
        CardKind::IntentDraft => Category::QUICK_START
            .into_iter()
            .chain([Category::Audio])
            .filter_map(QuickStart::for_category)
            .collect(),
        _ => Category::QUICK_START
            .into_iter()
            .filter_map(QuickStart::for_category)
            .collect(),
    }
}

pub fn card_chrome(node: &Node, has_children: bool, selected: bool) -> CardChrome {
    CardChrome {
        title: card_title(node),
        tooltip: card_tooltip(node),
        running: node.is_running(),
        selected,
        collapse_toggle: has_children.then_some(node.collapsed),
        quick_starts: quick_starts(node.kind),
        context_actions: ContextAction::ALL.to_vec(),
    }
}
