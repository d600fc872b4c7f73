use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::EngineError;

/// The visual kinds a beat can render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeatType {
    TitleCard,
    EquationReveal,
    EquationTransform,
    Highlight,
    StepReveal,
    GraphPlot,
    GraphAnimate,
    VectorShow,
    VectorTransform,
    MatrixDisplay,
    SummaryCard,
    TheoremCard,
    TextCard,
    Pause,
}

impl BeatType {
    pub const ALL: [BeatType; 14] = [
        BeatType::TitleCard,
        BeatType::EquationReveal,
        BeatType::EquationTransform,
        BeatType::Highlight,
        BeatType::StepReveal,
        BeatType::GraphPlot,
        BeatType::GraphAnimate,
        BeatType::VectorShow,
        BeatType::VectorTransform,
        BeatType::MatrixDisplay,
        BeatType::SummaryCard,
        BeatType::TheoremCard,
        BeatType::TextCard,
        BeatType::Pause,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeatType::TitleCard => "title_card",
            BeatType::EquationReveal => "equation_reveal",
            BeatType::EquationTransform => "equation_transform",
            BeatType::Highlight => "highlight",
            BeatType::StepReveal => "step_reveal",
            BeatType::GraphPlot => "graph_plot",
            BeatType::GraphAnimate => "graph_animate",
            BeatType::VectorShow => "vector_show",
            BeatType::VectorTransform => "vector_transform",
            BeatType::MatrixDisplay => "matrix_display",
            BeatType::SummaryCard => "summary_card",
            BeatType::TheoremCard => "theorem_card",
            BeatType::TextCard => "text_card",
            BeatType::Pause => "pause",
        }
    }

    /// Fields that must be present in `visual{}` for this type.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            BeatType::TitleCard => &["title"],
            BeatType::EquationReveal => &["latex"],
            BeatType::EquationTransform => &["from_latex", "to_latex"],
            BeatType::Highlight => &["target", "color"],
            BeatType::StepReveal => &["latex", "step_number"],
            BeatType::GraphPlot => &["functions", "x_range", "y_range"],
            BeatType::GraphAnimate => &["function_expr", "parameter", "range"],
            BeatType::VectorShow => &["vectors"],
            BeatType::VectorTransform => &["matrix", "vectors"],
            BeatType::MatrixDisplay => &["matrix_values"],
            BeatType::SummaryCard => &["key_points"],
            BeatType::TheoremCard => &["theorem_name", "statement_latex"],
            BeatType::TextCard => &["text"],
            BeatType::Pause => &[],
        }
    }

    /// All type names, sorted alphabetically.
    pub fn sorted_names() -> Vec<&'static str> {
        let mut names: Vec<_> = Self::ALL.iter().map(BeatType::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromStr for BeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown beat type: {}", s))
    }
}

impl fmt::Display for BeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The visual half of a beat: a type tag plus type-specific fields.
///
/// Fields are kept as an open JSON map so whatever the planner emitted
/// survives untouched into the generated scene file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visual {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Visual {
    pub fn new(kind: BeatType) -> Self {
        Self {
            kind: Some(kind.as_str().to_string()),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Parsed beat type, if the tag names a known one.
    pub fn beat_type(&self) -> Option<BeatType> {
        self.kind.as_deref().and_then(|k| k.parse().ok())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// True when neither a type nor any field was supplied.
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.fields.is_empty()
    }
}

/// One narration sentence paired with one visual action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    #[serde(default)]
    pub beat_id: String,
    #[serde(default)]
    pub narration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<Visual>,
}

impl Beat {
    pub fn new(beat_id: impl Into<String>, narration: impl Into<String>, visual: Visual) -> Self {
        Self {
            beat_id: beat_id.into(),
            narration: narration.into(),
            visual: Some(visual),
        }
    }

    /// Visual type name, defaulting to `text_card` like the scene registry does.
    pub fn visual_type(&self) -> &str {
        self.visual
            .as_ref()
            .and_then(|v| v.kind.as_deref())
            .unwrap_or("text_card")
    }
}

/// A complete video plan: title plus the flat, ordered beat list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub beats: Vec<Beat>,
}

impl Plan {
    /// Loads a saved plan from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Phase-one planner output: the chapter structure of a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_mins: Option<f64>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub concepts: Vec<String>,
    /// Kept untyped so the validator can report non-integer values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_beats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Chapter {
    /// Narrative role of the chapter (`why`, `what`, `how`, `example`, `insight`).
    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("what")
    }
}
