//! Per-card editing state and the events cards emit.
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{clamp_card_height, Category, ContextAction, MediaKind, MediaRef, Node, PhraseList};

const POSITIVE_KEY: &str = "positive_prompt";
const NEGATIVE_KEY: &str = "negative_prompt";
const TEXT_KEY: &str = "text";

/// Everything a rendered card can ask of the studio.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CardEvent {
    ToggleSelect { node_id: String },
    ToggleCollapse { node_id: String },
    Delete { node_id: String },
    OpenPreview { url: String, kind: MediaKind },
    AddClip { node_id: String, media: MediaRef },
    Regenerate(RegenerateRequest),
    OpenGeneration {
        anchor: String,
        module_id: String,
        category: Category,
    },
    Context { anchor: String, action: ContextAction },
    InvokeAgent {
        node_id: String,
        user_input: String,
        image_path: Option<String>,
    },
    Resized { node_id: String, height: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegenerateRequest {
    pub node_id: String,
    pub module_id: String,
    pub parameters: Map<String, Value>,
}

/// Short display names for long parameter ids.
pub fn param_alias(id: &str) -> &str {
    match id {
        "low_threshold" => "low",
        "high_threshold" => "high",
        "foreground_threshold" => "fg_thr",
        "background_threshold" => "bg_thr",
        "batch_size" => "batch",
        _ => id,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberHint {
    pub step: f64,
    pub min: f64,
    pub max: f64,
}

pub fn threshold_hint(id: &str) -> Option<NumberHint> {
    match id {
        "low_threshold" | "high_threshold" | "denoise" => Some(NumberHint {
            step: 0.01,
            min: 0.0,
            max: 1.0,
        }),
        "foreground_threshold" | "background_threshold" => Some(NumberHint {
            step: 1.0,
            min: 0.0,
            max: 255.0,
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamField {
    pub key: String,
    pub label: String,
    pub value: Value,
    pub hint: Option<NumberHint>,
}

/// Left pane of a generic card: prompt phrase lists and the parameter grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericCardEditor {
    node_id: String,
    module_id: String,
    pub positive: PhraseList,
    pub negative: Option<PhraseList>,
    #[serde(skip)]
    has_positive: bool,
    fields: Vec<ParamField>,
    pub params_open: bool,
}

impl GenericCardEditor {
    pub fn from_node(node: &Node) -> Self {
        let positive = PhraseList::parse(node.param_str(POSITIVE_KEY).unwrap_or_default());
        let negative = node
            .parameters
            .contains_key(NEGATIVE_KEY)
            .then(|| PhraseList::parse(node.param_str(NEGATIVE_KEY).unwrap_or_default()));
        let fields = node
            .parameters
            .iter()
            .filter(|(k, _)| k.as_str() != POSITIVE_KEY && k.as_str() != NEGATIVE_KEY)
            .map(|(k, v)| ParamField {
                key: k.clone(),
                label: param_alias(k).to_string(),
                value: v.clone(),
                hint: threshold_hint(k),
            })
            .collect();
        Self {
            node_id: node.id.clone(),
            module_id: node.module_id.clone(),
            positive,
            negative,
            has_positive: node.parameters.contains_key(POSITIVE_KEY),
            fields,
            params_open: false,
        }
    }

    pub fn fields(&self) -> &[ParamField] {
        &self.fields
    }

    /// Numbers with a hint are clamped into its range.
    pub fn set_param(&mut self, key: &str, value: Value) -> bool {
        let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
            return false;
        };
        field.value = match (field.hint, value.as_f64()) {
            (Some(hint), Some(n)) => serde_json::Number::from_f64(n.clamp(hint.min, hint.max))
                .map_or(value, Value::Number),
            _ => value,
        };
        true
    }

    pub fn toggle_params(&mut self) {
        self.params_open = !self.params_open;
    }

    /// Re-serializes every visible value, phrases included.
    pub fn regenerate(&self) -> RegenerateRequest {
        let mut parameters: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect();
        if self.has_positive {
            parameters.insert(POSITIVE_KEY.to_string(), Value::String(self.positive.serialize()));
        }
        if let Some(negative) = &self.negative {
            parameters.insert(NEGATIVE_KEY.to_string(), Value::String(negative.serialize()));
        }
        RegenerateRequest {
            node_id: self.node_id.clone(),
            module_id: self.module_id.clone(),
            parameters,
        }
    }
}

/// Free-text cards (intent drafts, narration, image+text): one text field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextCardEditor {
    node_id: String,
    module_id: String,
    pub text: String,
    rest: Map<String, Value>,
}

impl TextCardEditor {
    pub fn from_node(node: &Node) -> Self {
        let mut rest = node.parameters.clone();
        let text = match rest.remove(TEXT_KEY) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        Self {
            node_id: node.id.clone(),
            module_id: node.module_id.clone(),
            text,
            rest,
        }
    }

    pub fn regenerate(&self) -> RegenerateRequest {
        let mut parameters = self.rest.clone();
        parameters.insert(TEXT_KEY.to_string(), Value::String(self.text.clone()));
        RegenerateRequest {
            node_id: self.node_id.clone(),
            module_id: self.module_id.clone(),
            parameters,
        }
    }
}

/// Workflow-planning card: refinement text, input gallery and the agent call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningCard {
    node_id: String,
    pub text: String,
    gallery: Vec<MediaRef>,
}

impl PlanningCard {
    pub fn from_node(node: &Node) -> Self {
        let gallery = node
            .assets
            .input
            .all()
            .into_iter()
            .chain(node.assets.output.all())
            .filter(|m| m.kind == MediaKind::Image)
            .collect();
        Self {
            node_id: node.id.clone(),
            text: node.param_str(TEXT_KEY).unwrap_or_default().to_string(),
            gallery,
        }
    }

    pub fn gallery(&self) -> &[MediaRef] {
        &self.gallery
    }

    pub fn invoke_agent(&self) -> CardEvent {
        CardEvent::InvokeAgent {
            node_id: self.node_id.clone(),
            user_input: self.text.clone(),
            image_path: self.gallery.first().map(|m| m.path.clone()),
        }
    }
}

/// Output thumbnails of a card with click-to-pick for the storyboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaPicker {
    node_id: String,
    items: Vec<MediaRef>,
    picked: Vec<usize>,
}

impl MediaPicker {
    /// Videos before images; audio is not shown in the media pane.
    pub fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            items: node
                .assets
                .output
                .all()
                .into_iter()
                .filter(|m| m.kind != MediaKind::Audio)
                .collect(),
            picked: Vec::new(),
        }
    }

    pub fn items(&self) -> &[MediaRef] {
        &self.items
    }

    pub fn is_picked(&self, index: usize) -> bool {
        self.picked.contains(&index)
    }

    /// Single click.
    pub fn toggle(&mut self, index: usize) {
        if index >= self.items.len() {
            return;
        }
        if let Some(pos) = self.picked.iter().position(|&i| i == index) {
            self.picked.remove(pos);
        } else {
            self.picked.push(index);
        }
    }

    /// Double click.
    pub fn preview(&self, index: usize, media_base: &str) -> Option<CardEvent> {
        self.items.get(index).map(|m| CardEvent::OpenPreview {
            url: m.url(media_base),
            kind: m.kind,
        })
    }

    /// One add-clip event per picked item in display order; with nothing
    /// picked, the first item, preferring video. Clears the picks.
    pub fn add_to_storyboard(&mut self) -> Vec<CardEvent> {
        let mut picked = std::mem::take(&mut self.picked);
        picked.sort_unstable();
        let chosen: Vec<&MediaRef> = if picked.is_empty() {
            self.items
                .iter()
                .find(|m| m.kind == MediaKind::Video)
                .or_else(|| self.items.first())
                .into_iter()
                .collect()
        } else {
            picked.iter().filter_map(|&i| self.items.get(i)).collect()
        };
        chosen
            .into_iter()
            .map(|media| CardEvent::AddClip {
                node_id: self.node_id.clone(),
                media: media.clone(),
            })
            .collect()
    }
}

/// Bottom-edge drag on a generic card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardResize {
    start_height: f64,
    start_y: f64,
    height: f64,
}

impl CardResize {
    pub fn begin(height: f64, pointer_y: f64) -> Self {
        Self {
            start_height: height,
            start_y: pointer_y,
            height: clamp_card_height(height),
        }
    }

    pub fn drag(&mut self, pointer_y: f64) -> f64 {
        self.height = clamp_card_height(self.start_height + (pointer_y - self.start_y));
        self.height
    }

    pub fn finish(self, node_id: impl Into<String>) -> CardEvent {
        CardEvent::Resized {
            node_id: node_id.into(),
            height: self.height,
        }
    }
}

/// `m:ss`, or `--:--` when unknown.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Playback strip of an audio card.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudioStrip {
    pub playing: bool,
    pub position: f64,
    pub duration: Option<f64>,
    released: bool,
}

impl AudioStrip {
    pub fn ready(&mut self, duration: f64) {
        self.duration = Some(duration);
    }

    pub fn toggle_play(&mut self) -> bool {
        if !self.released {
            self.playing = !self.playing;
        }
        self.playing
    }

    pub fn time_update(&mut self, position: f64) {
        self.position = position;
    }

    pub fn finish(&mut self) {
        self.playing = false;
    }

    /// Called when the card goes away; the strip stops for good.
    pub fn release(&mut self) {
        self.playing = false;
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position),
            format_clock(self.duration.unwrap_or(f64::NAN))
        )
    }
}

/// The audio card's add-to-storyboard control, present only with output audio.
pub fn audio_clip_event(node: &Node) -> Option<CardEvent> {
    let media = node.media.as_ref().filter(|m| m.kind == MediaKind::Audio)?;
    Some(CardEvent::AddClip {
        node_id: node.id.clone(),
        media: media.clone(),
    })
}
