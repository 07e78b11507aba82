use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{listed_operations, operation, Category, OperationSpec, ParamKind, ParamSpec, QuickStart};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("parameter {key}: `{raw}` is not a number")]
    NotANumber { key: String, raw: String },
    #[error("parameter {key}: `{raw}` is not one of {options:?}")]
    NotAnOption {
        key: String,
        raw: String,
        options: Vec<String>,
    },
}

/// Values of the generation form for one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationForm {
    category: Option<Category>,
    module_id: String,
    values: Map<String, Value>,
    /// Card the form was opened from, if any.
    anchor: Option<String>,
}

fn defaults(module_id: &str) -> Map<String, Value> {
    operation(module_id)
        .map(|op| op.params.iter().map(|p| (p.id.to_string(), p.default.to_value())).collect())
        .unwrap_or_default()
}

impl GenerationForm {
    /// Opens on `module_id`, else on the first operation of `category`.
    pub fn open(category: Option<Category>, module_id: Option<&str>, anchor: Option<String>) -> Self {
        let module_id = module_id
            .map(str::to_string)
            .or_else(|| listed_operations(category).next().map(|op| op.id.to_string()))
            .unwrap_or_default();
        Self {
            category,
            values: defaults(&module_id),
            module_id,
            anchor,
        }
    }

    pub fn for_quick_start(quick_start: &QuickStart, anchor: impl Into<String>) -> Self {
        Self::open(
            Some(quick_start.category),
            Some(quick_start.module_id),
            Some(anchor.into()),
        )
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn available(&self) -> Vec<&'static OperationSpec> {
        listed_operations(self.category).collect()
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        operation(&self.module_id).map(|op| op.params).unwrap_or(&[])
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Switching operation resets every value to the new schema's defaults.
    pub fn select(&mut self, module_id: &str) -> bool {
        if module_id.is_empty() || module_id == self.module_id {
            return false;
        }
        self.module_id = module_id.to_string();
        self.values = defaults(module_id);
        true
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Parses `raw` according to the parameter's schema. Unknown keys are
    /// taken as JSON when they parse, else as plain text.
    pub fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), ParamError> {
        let param = self.params().iter().find(|p| p.id == key);
        let value = match param.map(|p| p.kind) {
            Some(ParamKind::Number { .. }) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    let n: f64 = trimmed.parse().map_err(|_| ParamError::NotANumber {
                        key: key.to_string(),
                        raw: raw.to_string(),
                    })?;
                    serde_json::Number::from_f64(n).map(Value::Number).ok_or_else(|| ParamError::NotANumber {
                        key: key.to_string(),
                        raw: raw.to_string(),
                    })?
                }
            }
            Some(ParamKind::Select { options }) => {
                if !options.iter().any(|o| *o == raw) {
                    return Err(ParamError::NotAnOption {
                        key: key.to_string(),
                        raw: raw.to_string(),
                        options: options.iter().map(|o| o.to_string()).collect(),
                    });
                }
                Value::String(raw.to_string())
            }
            Some(ParamKind::Textarea { .. }) => Value::String(raw.to_string()),
            None => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        };
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Operation id and parameters to send. The image-to-image form picks
    /// its concrete workflow from the LoRA selector.
    pub fn submit(&self) -> (String, Map<String, Value>) {
        let mut values = self.values.clone();
        if self.module_id == "ImageGenerateImage" {
            let lora = values.remove("lora_selector");
            let module = match lora.as_ref().and_then(Value::as_str) {
                Some("Canny") => "ImageGenerateImage_Canny",
                _ => "ImageGenerateImage_Basic",
            };
            return (module.to_string(), values);
        }
        (self.module_id.clone(), values)
    }
}
