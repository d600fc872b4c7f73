//! Writes one self-contained Manim module per beat.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use mathviz_core::{Beat, BeatType, EngineError};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::template::{body_for, HEADER, RUNTIME};
use super::text::{normalize_text, resolve_color, safe_range};

/// Scene length used when a beat has no computed duration.
pub const DEFAULT_SCENE_DURATION: f64 = 10.0;

const CLASS_PREFIX: &str = "MathVizScene_";

/// Plain-text fields that go through [`normalize_text`].
const DISPLAY_FIELDS: &[&str] = &["title", "subtitle", "text", "label", "theorem_name"];

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"));

/// Theme and accent applied to every scene of a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneStyle {
    pub theme: String,
    pub accent_color: String,
}

impl SceneStyle {
    pub fn new(theme: impl Into<String>, accent_color: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            accent_color: accent_color.into(),
        }
    }
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self::new("dark", "#58C4DD")
    }
}

/// A written scene module.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFile {
    pub beat_id: String,
    pub path: PathBuf,
    pub class_name: String,
}

/// Python class name for a beat: non-alphanumerics become `_`, case is kept.
pub fn to_class_name(beat_id: &str) -> String {
    format!("{}{}", CLASS_PREFIX, NON_ALNUM.replace_all(beat_id, "_"))
}

fn numbers(value: Option<&Value>) -> Vec<f64> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}

fn as_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_text(s),
        other => normalize_text(&other.to_string()),
    }
}

/// Normalizes label/color fields of each object in an array field.
fn clean_objects(fields: &mut Map<String, Value>, key: &str, fallback_color: &str) {
    let Some(Value::Array(items)) = fields.get_mut(key) else {
        return;
    };
    for obj in items.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(label) = obj.get("label").filter(|l| !l.is_null()) {
            let label = as_display_string(label);
            obj.insert("label".into(), Value::String(label));
        }
        let color = obj.get("color").and_then(Value::as_str).unwrap_or("");
        let color = resolve_color(color, fallback_color);
        obj.insert("color".into(), Value::String(color));
    }
}

/// Visual fields as the Python scene expects them: display text normalized,
/// colors resolved, axis ranges padded. LaTeX is left alone.
fn prepare_visual(kind: BeatType, beat: &Beat) -> Map<String, Value> {
    let mut fields = beat
        .visual
        .as_ref()
        .map(|v| v.fields.clone())
        .unwrap_or_default();

    for key in DISPLAY_FIELDS {
        if let Some(Value::String(s)) = fields.get_mut(*key) {
            *s = normalize_text(s);
        }
    }

    match kind {
        BeatType::Highlight => {
            let color = fields.get("color").and_then(Value::as_str).unwrap_or("");
            let color = resolve_color(color, "YELLOW");
            fields.insert("color".into(), Value::String(color));
        }
        BeatType::SummaryCard => {
            if let Some(Value::Array(points)) = fields.get_mut("key_points") {
                for point in points.iter_mut() {
                    *point = Value::String(as_display_string(point));
                }
            }
        }
        BeatType::GraphPlot => {
            clean_objects(&mut fields, "functions", "BLUE_C");
            for key in ["x_range", "y_range"] {
                let range = safe_range(&numbers(fields.get(key)));
                fields.insert(key.into(), json!(range));
            }
        }
        BeatType::VectorShow => clean_objects(&mut fields, "vectors", "BLUE"),
        BeatType::TextCard => {
            if !fields.get("text").is_some_and(Value::is_string) {
                fields.insert("text".into(), Value::String(normalize_text(&beat.narration)));
            }
        }
        _ => {}
    }

    fields.insert("type".into(), Value::String(kind.as_str().to_string()));
    fields
}

/// Python source and class name for a beat's scene.
///
/// Unknown or missing visual types render as `text_card`.
pub fn scene_source(
    beat: &Beat,
    style: &SceneStyle,
    total_duration: f64,
    audio_path: Option<&Path>,
) -> Result<(String, String), EngineError> {
    let kind = beat
        .visual
        .as_ref()
        .and_then(|v| v.beat_type())
        .unwrap_or(BeatType::TextCard);
    let class_name = to_class_name(&beat.beat_id);

    let payload = json!({
        "beat_id": beat.beat_id,
        "theme": style.theme,
        "accent_color": resolve_color(&style.accent_color, "BLUE_C"),
        "visual": Value::Object(prepare_visual(kind, beat)),
    });
    // A JSON string literal is also a valid Python string literal.
    let beat_literal = serde_json::to_string(&serde_json::to_string(&payload)?)?;
    let audio_literal = match audio_path {
        Some(p) => serde_json::to_string(&p.to_string_lossy())?,
        None => "None".to_string(),
    };

    let mut src = String::with_capacity(HEADER.len() + RUNTIME.len() + 2048);
    src.push_str(HEADER);
    src.push('\n');
    src.push_str(&format!("_DURATION = {:.3}\n", total_duration));
    src.push_str(&format!("_AUDIO_FILE = {}\n", audio_literal));
    src.push_str(&format!("_BEAT = json.loads({})\n", beat_literal));
    src.push_str(RUNTIME);
    src.push_str(&format!("\n\nclass {}(BeatScene):\n", class_name));
    src.push_str("    def construct(self):\n");
    src.push_str("        self.setup_theme()\n");
    src.push_str("        self.add_audio()\n");
    src.push_str("        v = self.v\n");
    src.push_str(body_for(kind));
    src.push_str("        self.pad_to_duration()\n");

    Ok((src, class_name))
}

/// Writes the scene module for one beat and returns `(path, class_name)`.
pub async fn build_scene_file(
    beat: &Beat,
    style: &SceneStyle,
    total_duration: f64,
    audio_path: Option<&Path>,
    output_file: &Path,
) -> Result<(PathBuf, String), EngineError> {
    let (source, class_name) = scene_source(beat, style, total_duration, audio_path)?;

    if let Some(parent) = output_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::io(parent, e))?;
    }
    tokio::fs::write(output_file, source)
        .await
        .map_err(|e| EngineError::io(output_file, e))?;

    debug!("Scene {} -> {}", class_name, output_file.display());
    Ok((output_file.to_path_buf(), class_name))
}

/// Writes a module per beat into `scene_dir`, in input order.
pub async fn build_all_scene_files(
    beats: &[Beat],
    style: &SceneStyle,
    durations: &HashMap<String, f64>,
    audio_paths: &HashMap<String, PathBuf>,
    scene_dir: &Path,
) -> Result<Vec<SceneFile>, EngineError> {
    let mut files = Vec::with_capacity(beats.len());

    for beat in beats {
        let duration = durations
            .get(&beat.beat_id)
            .copied()
            .unwrap_or(DEFAULT_SCENE_DURATION);
        let file_name = format!("beat_{}.py", NON_ALNUM.replace_all(&beat.beat_id, "_"));
        let audio = audio_paths.get(&beat.beat_id).map(PathBuf::as_path);

        let (path, class_name) =
            build_scene_file(beat, style, duration, audio, &scene_dir.join(file_name)).await?;
        files.push(SceneFile {
            beat_id: beat.beat_id.clone(),
            path,
            class_name,
        });
    }

    Ok(files)
}
