//! Weighted prompt phrases: `cat:1.0, (red hat:0.5), sky`.
use serde::{Deserialize, Serialize};

pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 1.9;
pub const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub text: String,
    pub weight: f64,
}

impl Phrase {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight: clamp_weight(weight),
        }
    }
}

impl Default for Phrase {
    fn default() -> Self {
        Self {
            text: String::new(),
            weight: DEFAULT_WEIGHT,
        }
    }
}

/// Clamps to `[0.0, 1.9]`. Non-finite input falls back to 1.0.
pub fn clamp_weight(weight: f64) -> f64 {
    if !weight.is_finite() {
        return DEFAULT_WEIGHT;
    }
    weight.clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Clamped and snapped to the 0.1 step of the weight input.
pub fn step_weight(weight: f64) -> f64 {
    (clamp_weight(weight) * 10.0).round() / 10.0
}

/// Shortest form that keeps the value, with at least one decimal.
fn format_weight(weight: f64) -> String {
    let text = weight.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{weight:.1}")
    }
}

fn parse_segment(segment: &str) -> Option<Phrase> {
    let mut s = segment.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|x| x.strip_suffix(')')) {
        s = inner.trim();
    }
    if s.is_empty() {
        return None;
    }
    if let Some((text, weight)) = s.rsplit_once(':') {
        if let Ok(w) = weight.trim().parse::<f64>() {
            let text = text.trim();
            if !text.is_empty() {
                return Some(Phrase::new(text, w));
            }
        }
    }
    Some(Phrase::new(s, DEFAULT_WEIGHT))
}

/// Splits a prompt into phrases. A segment whose weight does not parse keeps
/// its whole text and gets weight 1.0.
pub fn parse_phrases(prompt: &str) -> Vec<Phrase> {
    prompt.split(',').filter_map(parse_segment).collect()
}

pub fn serialize_phrases(phrases: &[Phrase]) -> String {
    phrases
        .iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| format!("{}:{}", p.text.trim(), format_weight(clamp_weight(p.weight))))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Row editor over one prompt field. Always holds at least one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhraseList {
    rows: Vec<Phrase>,
}

impl PhraseList {
    pub fn parse(prompt: &str) -> Self {
        let rows = parse_phrases(prompt);
        if rows.is_empty() {
            Self {
                rows: vec![Phrase::default()],
            }
        } else {
            Self { rows }
        }
    }

    pub fn rows(&self) -> &[Phrase] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|p| p.text.trim().is_empty())
    }

    /// Inserts an empty row below `index` and returns the new row's index.
    pub fn insert_below(&mut self, index: usize) -> usize {
        let at = (index + 1).min(self.rows.len());
        self.rows.insert(at, Phrase::default());
        at
    }

    pub fn delete(&mut self, index: usize) {
        if index >= self.rows.len() {
            return;
        }
        self.rows.remove(index);
        if self.rows.is_empty() {
            self.rows.push(Phrase::default());
        }
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) {
        if let Some(row) = self.rows.get_mut(index) {
            row.text = text.into();
        }
    }

    pub fn set_weight(&mut self, index: usize, weight: f64) {
        if let Some(row) = self.rows.get_mut(index) {
            row.weight = step_weight(weight);
        }
    }

    pub fn serialize(&self) -> String {
        serialize_phrases(&self.rows)
    }
}
