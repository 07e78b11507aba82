use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PreconditionError;

pub const DEFAULT_LINK_COLOR: &str = "#9ca3af";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Preprocess,
    Image,
    Video,
    Audio,
    Utility,
}

impl Category {
    /// Categories offered as quick-start buttons on a card.
    pub const QUICK_START: [Category; 3] = [Category::Preprocess, Category::Image, Category::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Utility => "utility",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preprocess" => Some(Self::Preprocess),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "utility" | "util" => Some(Self::Utility),
            _ => None,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Preprocess => "#ef4444",
            Self::Image => "#f59e0b",
            Self::Video => "#10b981",
            Self::Audio => "#3b82f6",
            Self::Utility => DEFAULT_LINK_COLOR,
        }
    }

    /// Operation a quick-start button of this category opens with.
    pub fn default_module(&self) -> Option<&'static str> {
        match self {
            Self::Preprocess => Some("ImageCanny"),
            Self::Image => Some("TextGenerateImage"),
            Self::Video => Some("TextGenerateVideo"),
            Self::Audio => Some("TextToAudio"),
            Self::Utility => None,
        }
    }
}

/// How many selected parents an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRequirement {
    Any,
    AtLeastOne,
    ExactlyTwo,
}

impl ParentRequirement {
    pub fn check(&self, module: &str, parents: usize) -> Result<(), PreconditionError> {
        match self {
            Self::Any => Ok(()),
            Self::AtLeastOne if parents == 0 => Err(PreconditionError::MissingParent {
                module: module.to_string(),
            }),
            Self::AtLeastOne => Ok(()),
            Self::ExactlyTwo if parents != 2 => Err(PreconditionError::TwoParentsRequired {
                module: module.to_string(),
                got: parents,
            }),
            Self::ExactlyTwo => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    Null,
    Number(f64),
    Text(&'static str),
}

impl ParamDefault {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String((*s).to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamKind {
    Number {
        step: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Select {
        options: &'static [&'static str],
    },
    Textarea {
        placeholder: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub default: ParamDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperationSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub parents: ParentRequirement,
    /// Shown in the generation form's operation picker.
    pub listed: bool,
    pub params: &'static [ParamSpec],
}

const fn number(id: &'static str, label: &'static str, default: ParamDefault, step: Option<f64>) -> ParamSpec {
    ParamSpec {
        id,
        label,
        kind: ParamKind::Number {
            step,
            min: None,
            max: None,
        },
        default,
    }
}

const fn textarea(id: &'static str, label: &'static str, placeholder: &'static str) -> ParamSpec {
    ParamSpec {
        id,
        label,
        kind: ParamKind::Textarea { placeholder },
        default: ParamDefault::Text(""),
    }
}

const fn select(
    id: &'static str,
    label: &'static str,
    options: &'static [&'static str],
    default: &'static str,
) -> ParamSpec {
    ParamSpec {
        id,
        label,
        kind: ParamKind::Select { options },
        default: ParamDefault::Text(default),
    }
}

const SEED: ParamSpec = number("seed", "Seed", ParamDefault::Null, None);
const STEPS: ParamSpec = number("steps", "Steps", ParamDefault::Number(20.0), None);
const GUIDANCE: ParamSpec = number("guidance", "Guidance", ParamDefault::Number(7.5), Some(0.1));
const WIDTH: ParamSpec = number("width", "width", ParamDefault::Number(1024.0), None);
const HEIGHT: ParamSpec = number("height", "height", ParamDefault::Number(512.0), None);
const BATCH: ParamSpec = number("batch_size", "batch_size", ParamDefault::Number(1.0), None);
const FPS: ParamSpec = number("fps", "fps", ParamDefault::Number(16.0), Some(1.0));
const LENGTH: ParamSpec = number("length", "length", ParamDefault::Number(41.0), Some(8.0));
const PROMPT: ParamSpec = textarea("positive_prompt", "Prompt", "Your creative prompt...");
const POSITIVE: ParamSpec = textarea("positive_prompt", "Positive Prompt", "Your positive prompt...");
const NEGATIVE: ParamSpec = textarea("negative_prompt", "Negative Prompt", "Your negative prompt...");
const TEXT: ParamSpec = textarea("text", "Text", "Describe what you want...");

const CANNY_THRESHOLDS: [ParamSpec; 2] = [
    ParamSpec {
        id: "low_threshold",
        label: "Low Threshold",
        kind: ParamKind::Number {
            step: Some(0.01),
            min: Some(0.0),
            max: Some(1.0),
        },
        default: ParamDefault::Number(0.1),
    },
    ParamSpec {
        id: "high_threshold",
        label: "High Threshold",
        kind: ParamKind::Number {
            step: Some(0.01),
            min: Some(0.0),
            max: Some(1.0),
        },
        default: ParamDefault::Number(0.8),
    },
];

const REMOVE_BACKGROUND: [ParamSpec; 4] = [
    select(
        "model",
        "Model",
        &["u2net", "u2netp", "silueta", "isnet-general-use", "isnet-anime"],
        "u2net",
    ),
    number("foreground_threshold", "foreground_threshold", ParamDefault::Number(240.0), None),
    number("background_threshold", "background_threshold", ParamDefault::Number(10.0), None),
    number("erode_size", "erode_size", ParamDefault::Number(10.0), None),
];

const MERGING: [ParamSpec; 1] = [select(
    "stitch",
    "image stitch",
    &["top", "left", "bottom", "right"],
    "right",
)];

const TEXT_TO_IMAGE: [ParamSpec; 7] = [PROMPT, SEED, STEPS, GUIDANCE, WIDTH, HEIGHT, BATCH];

const IMAGE_TO_IMAGE: [ParamSpec; 8] = [
    select("lora_selector", "LORA", &["None", "Canny"], "None"),
    PROMPT,
    SEED,
    STEPS,
    GUIDANCE,
    WIDTH,
    HEIGHT,
    BATCH,
];

const IMAGE_TO_IMAGE_CANNY: [ParamSpec; 9] = [
    PROMPT,
    SEED,
    STEPS,
    GUIDANCE,
    WIDTH,
    HEIGHT,
    BATCH,
    CANNY_THRESHOLDS[0],
    CANNY_THRESHOLDS[1],
];

const HD_RESTORATION: [ParamSpec; 4] = [
    POSITIVE,
    NEGATIVE,
    SEED,
    number("denoise", "denoise", ParamDefault::Number(0.1), Some(0.01)),
];

const REPAINT: [ParamSpec; 4] = [PROMPT, SEED, STEPS, GUIDANCE];

const VIDEO: [ParamSpec; 8] = [POSITIVE, NEGATIVE, SEED, FPS, WIDTH, HEIGHT, LENGTH, BATCH];

const CAMERA_CONTROL: [ParamSpec; 9] = [
    POSITIVE,
    NEGATIVE,
    SEED,
    select(
        "camera_pose",
        "camera_pose",
        &[
            "Pan Up",
            "Pan Down",
            "Pan Left",
            "Pan Right",
            "Zoom In",
            "Zoom Out",
            "Anti Clockwise (ACW)",
            "ClockWise (CW)",
        ],
        "Pan Up",
    ),
    FPS,
    WIDTH,
    HEIGHT,
    LENGTH,
    BATCH,
];

const FRAME_INTERPOLATION: [ParamSpec; 2] = [
    number("multiplier", "multiplier", ParamDefault::Number(2.0), None),
    FPS,
];

const TEXT_TO_AUDIO: [ParamSpec; 2] = [textarea("text", "Narration", "Text to speak..."), SEED];

const TEXT_ONLY: [ParamSpec; 1] = [TEXT];

const fn op(
    id: &'static str,
    name: &'static str,
    category: Category,
    parents: ParentRequirement,
    listed: bool,
    params: &'static [ParamSpec],
) -> OperationSpec {
    OperationSpec {
        id,
        name,
        category,
        parents,
        listed,
        params,
    }
}

use Category::*;
use ParentRequirement::*;

static OPERATIONS: [OperationSpec; 21] = [
    op("ImageCanny", "ImageCanny", Preprocess, AtLeastOne, true, &CANNY_THRESHOLDS),
    op("RemoveBackground", "RemoveBackground", Preprocess, AtLeastOne, true, &REMOVE_BACKGROUND),
    op("ImageMerging", "ImageMerging", Preprocess, ExactlyTwo, true, &MERGING),
    op("TextGenerateImage", "TextToImage", Image, Any, true, &TEXT_TO_IMAGE),
    op("ImageGenerateImage", "ImageToImage", Image, AtLeastOne, true, &IMAGE_TO_IMAGE),
    op("ImageGenerateImage_Basic", "ImageToImage", Image, AtLeastOne, false, &TEXT_TO_IMAGE),
    op("ImageGenerateImage_Canny", "ImageToImage (Canny)", Image, AtLeastOne, false, &IMAGE_TO_IMAGE_CANNY),
    op("PartialRepainting", "PartialRepainting", Image, Any, true, &REPAINT),
    op("ImageHDRestoration", "ImageHDRestoration", Image, Any, true, &HD_RESTORATION),
    op("Put_It_Here", "ObjectMigration", Image, Any, true, &[]),
    op("TextGenerateVideo", "TextToVideo", Video, Any, true, &VIDEO),
    op("ImageGenerateVideo", "ImageToVideo", Video, AtLeastOne, true, &VIDEO),
    op("CameraControl", "CameraControl", Video, Any, true, &CAMERA_CONTROL),
    op("FrameInterpolation", "FrameInterpolation", Video, Any, true, &FRAME_INTERPOLATION),
    op("FLFrameToVideo", "FirstAndLastFrameControl", Video, Any, true, &VIDEO),
    op("TextToAudio", "TextToAudio", Audio, Any, true, &TEXT_TO_AUDIO),
    op("Init", "Init", Utility, Any, false, &[]),
    op("AddText", "Text", Utility, Any, false, &TEXT_ONLY),
    op("AddWorkflow", "WorkflowPlanning", Utility, Any, false, &TEXT_ONLY),
    op("Upload", "Upload", Utility, Any, false, &[]),
    op("AddImageText", "ImageText", Utility, Any, false, &TEXT_ONLY),
];

pub fn operations() -> &'static [OperationSpec] {
    &OPERATIONS
}

pub fn operation(id: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.id == id)
}

/// Operations offered in the generation form, optionally limited to one category.
pub fn listed_operations(category: Option<Category>) -> impl Iterator<Item = &'static OperationSpec> {
    OPERATIONS
        .iter()
        .filter(move |op| op.listed && category.map_or(true, |c| op.category == c))
}

/// Colour of the link drawn into a node produced by `module_id`.
pub fn link_color(module_id: &str) -> &'static str {
    operation(module_id).map_or(DEFAULT_LINK_COLOR, |op| op.category.color())
}

/// Operations missing from the catalog carry no parent constraint.
pub fn check_parents(module_id: &str, parents: usize) -> Result<(), PreconditionError> {
    match operation(module_id) {
        Some(op) => op.parents.check(module_id, parents),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<&str> = operations().iter().map(|op| op.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), operations().len());
    }

    #[test]
    fn test_parent_requirements() {
        assert_eq!(
            check_parents("ImageGenerateImage_Basic", 0),
            Err(PreconditionError::MissingParent {
                module: "ImageGenerateImage_Basic".into()
            })
        );
        assert!(check_parents("ImageGenerateVideo", 1).is_ok());
        assert_eq!(
            check_parents("ImageMerging", 1),
            Err(PreconditionError::TwoParentsRequired {
                module: "ImageMerging".into(),
                got: 1
            })
        );
        assert!(check_parents("ImageMerging", 2).is_ok());
        assert!(check_parents("TextGenerateImage", 0).is_ok());
        assert!(check_parents("Nope", 0).is_ok());
        assert!(check_parents("Nope", 2).is_ok());
    }

    #[test]
    fn test_link_colors() {
        assert_eq!(link_color("ImageCanny"), "#ef4444");
        assert_eq!(link_color("TextGenerateImage"), "#f59e0b");
        assert_eq!(link_color("CameraControl"), "#10b981");
        assert_eq!(link_color("TextToAudio"), "#3b82f6");
        assert_eq!(link_color("Upload"), DEFAULT_LINK_COLOR);
        assert_eq!(link_color("SomethingNew"), DEFAULT_LINK_COLOR);
    }

    #[test]
    fn test_listed_by_category() {
        let video: Vec<&str> = listed_operations(Some(Category::Video)).map(|op| op.id).collect();
        assert_eq!(
            video,
            vec![
                "TextGenerateVideo",
                "ImageGenerateVideo",
                "CameraControl",
                "FrameInterpolation",
                "FLFrameToVideo"
            ]
        );
        assert!(listed_operations(None).all(|op| op.category != Category::Utility));
    }

    #[test]
    fn test_defaults_to_json() {
        let canny = operation("ImageCanny").unwrap();
        assert_eq!(canny.params[0].default.to_value(), serde_json::json!(0.1));
        assert_eq!(SEED.default.to_value(), Value::Null);
        assert_eq!(MERGING[0].default.to_value(), serde_json::json!("right"));
    }
}
