//! Beat and outline validation.
//!
//! Layers:
//!   1. Beat schema (required fields, allowed types)
//!   2. LaTeX brace matching
//!   3. LaTeX command whitelist
//!   4. Outline schema (chapters, n_beats)

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{Beat, BeatType, Outline};

/// Visual fields holding LaTeX that must pass the brace check.
const LATEX_FIELDS: [&str; 5] = ["latex", "from_latex", "to_latex", "target", "statement_latex"];

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+").expect("static regex"));

static ALLOWED_COMMANDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // fractions & operators
        r"\frac", r"\dfrac", r"\sqrt", r"\pm", r"\mp", r"\cdot", r"\times", r"\div",
        // greek
        r"\alpha", r"\beta", r"\gamma", r"\delta", r"\epsilon", r"\theta", r"\lambda",
        r"\mu", r"\sigma", r"\phi", r"\psi", r"\omega", r"\pi", r"\eta", r"\kappa",
        r"\nu", r"\rho", r"\tau", r"\xi", r"\zeta", r"\Gamma", r"\Delta", r"\Theta",
        r"\Lambda", r"\Sigma", r"\Phi", r"\Psi", r"\Omega", r"\Pi",
        // calculus
        r"\int", r"\iint", r"\iiint", r"\oint", r"\sum", r"\prod", r"\lim", r"\infty",
        r"\partial", r"\nabla",
        // linear algebra
        r"\vec", r"\hat", r"\bar", r"\dot", r"\ddot", r"\begin", r"\end", r"\det",
        r"\tr", r"\rank",
        // relations
        r"\leq", r"\geq", r"\neq", r"\approx", r"\equiv", r"\sim", r"\rightarrow",
        r"\Rightarrow", r"\leftarrow", r"\Leftarrow", r"\leftrightarrow", r"\implies",
        r"\iff", r"\in", r"\notin", r"\subset", r"\subseteq", r"\cup", r"\cap",
        r"\forall", r"\exists",
        // formatting
        r"\text", r"\mathrm", r"\mathbf", r"\mathbb", r"\mathcal", r"\left", r"\right",
        r"\big", r"\Big", r"\bigg", r"\Bigg", r"\quad", r"\qquad", r"\underbrace",
        r"\overbrace", r"\overline", r"\underline", r"\binom", r"\choose", r"\cdots",
        r"\ldots", r"\ddots", r"\vdots", r"\not", r"\mid",
        // functions
        r"\sin", r"\cos", r"\tan", r"\cot", r"\sec", r"\csc", r"\arcsin", r"\arccos",
        r"\arctan", r"\sinh", r"\cosh", r"\tanh", r"\log", r"\ln", r"\exp", r"\max",
        r"\min", r"\sup", r"\inf", r"\arg", r"\Re", r"\Im", r"\gcd", r"\lcm",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `{` / `}` are balanced and never close before opening.
pub fn check_braces(latex: &str) -> bool {
    let mut depth: i64 = 0;
    for c in latex.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

/// Returns every LaTeX command in `latex` that is not whitelisted.
pub fn check_commands(latex: &str) -> Vec<String> {
    COMMAND_RE
        .find_iter(latex)
        .map(|m| m.as_str())
        .filter(|cmd| !ALLOWED_COMMANDS.contains(cmd))
        .map(String::from)
        .collect()
}

/// String form of a LaTeX-bearing value, or None when it is empty/falsy.
fn latex_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Validates a single beat. An empty list means the beat is usable.
pub fn validate_beat(beat: &Beat) -> Vec<String> {
    let mut errors = Vec::new();
    let bid = if beat.beat_id.is_empty() { "?" } else { beat.beat_id.as_str() };

    if beat.beat_id.is_empty() {
        errors.push("Beat missing 'beat_id'".to_string());
    }

    if beat.narration.trim().is_empty() {
        errors.push(format!("Beat '{}': empty narration", bid));
    }

    let Some(visual) = beat.visual.as_ref().filter(|v| !v.is_empty()) else {
        errors.push(format!("Beat '{}': missing 'visual'", bid));
        return errors;
    };

    let Some(beat_type) = visual.beat_type() else {
        let allowed = BeatType::sorted_names()
            .iter()
            .map(|n| format!("'{}'", n))
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(format!(
            "Beat '{}': unknown visual type '{}'. Allowed: [{}]",
            bid,
            visual.kind.as_deref().unwrap_or("None"),
            allowed
        ));
        return errors;
    };

    for field in beat_type.required_fields() {
        if !visual.fields.contains_key(*field) {
            errors.push(format!(
                "Beat '{}' ({}): missing required field '{}'",
                bid, beat_type, field
            ));
        }
    }

    for field in LATEX_FIELDS {
        let Some(text) = visual.get(field).and_then(latex_text) else {
            continue;
        };
        if !check_braces(&text) {
            let preview: String = text.chars().take(80).collect();
            errors.push(format!(
                "Beat '{}': unbalanced braces in '{}': {}",
                bid, field, preview
            ));
        }
    }

    errors
}

/// Validates a beat list, including beat_id uniqueness.
pub fn validate_beats(beats: &[Beat]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for beat in beats {
        let bid = beat.beat_id.as_str();
        if !bid.is_empty() && !seen.insert(bid) {
            errors.push(format!("Duplicate beat_id: '{}'", bid));
        }
        errors.extend(validate_beat(beat));
    }

    errors
}

/// Validates a phase-one outline.
pub fn validate_outline(outline: &Outline) -> Vec<String> {
    let mut errors = Vec::new();

    if outline.title.is_empty() {
        errors.push("Outline missing 'title'".to_string());
    }

    if outline.chapters.is_empty() {
        errors.push("Outline has no 'chapters'".to_string());
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (i, ch) in outline.chapters.iter().enumerate() {
        let fallback = format!("chapter_{}", i);
        let cid = if ch.id.is_empty() { fallback.as_str() } else { ch.id.as_str() };

        if ch.id.is_empty() {
            errors.push(format!("Chapter {}: missing 'id'", i));
        } else if !seen.insert(ch.id.as_str()) {
            errors.push(format!("Duplicate chapter id: '{}'", cid));
        }

        if ch.title.is_empty() {
            errors.push(format!("Chapter '{}': missing 'title'", cid));
        }

        match ch.n_beats.as_ref().filter(|v| !v.is_null()) {
            None => errors.push(format!("Chapter '{}': missing 'n_beats'", cid)),
            Some(v) if v.as_u64().is_some_and(|n| n >= 1) => {}
            Some(v) => errors.push(format!(
                "Chapter '{}': 'n_beats' must be a positive integer, got {}",
                cid, v
            )),
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chapter, Visual};
    use serde_json::json;

    fn beat(id: &str, visual: Visual) -> Beat {
        Beat::new(id, "Some narration.", visual)
    }

    #[test]
    fn braces_balanced_cases() {
        assert!(check_braces(""));
        assert!(check_braces(r"\frac{a}{b}"));
        assert!(check_braces(r"\frac{\sqrt{x^{2}}}{2}"));
        assert!(check_braces(r"\frac{}{}"));
        assert!(check_braces("plain text"));
        assert!(check_braces("$x^{2}$"));
    }

    #[test]
    fn braces_unbalanced_cases() {
        assert!(!check_braces(r"\frac{a}{b"));
        assert!(!check_braces("a}"));
        assert!(!check_braces("}{"));
        assert!(!check_braces("{{{x}}"));
    }

    #[test]
    fn long_equation_is_fine() {
        let eq = r"\frac{a}{b} + ".repeat(200);
        assert!(check_braces(&eq));
    }

    #[test]
    fn commands_whitelist() {
        assert!(check_commands("x + y").is_empty());
        assert!(check_commands(r"\frac{\alpha}{\beta} \cdot \int_0^\infty").is_empty());
        assert_eq!(check_commands(r"\usepackage{amsmath}"), vec![r"\usepackage"]);
        assert_eq!(
            check_commands(r"\foo + \bar + \baz"),
            vec![r"\foo".to_string(), r"\baz".to_string()]
        );
        assert!(check_commands("λ x").is_empty());
        assert!(check_commands(r"\, \; \!").is_empty());
    }

    #[test]
    fn valid_beats_of_every_type_pass() {
        let beats = vec![
            beat("b1", Visual::new(BeatType::TitleCard).with("title", "T")),
            beat("b2", Visual::new(BeatType::EquationReveal).with("latex", r"\lambda")),
            beat(
                "b3",
                Visual::new(BeatType::EquationTransform)
                    .with("from_latex", "Av")
                    .with("to_latex", r"\lambda v"),
            ),
            beat("b4", Visual::new(BeatType::Highlight).with("target", "x").with("color", "RED")),
            beat("b5", Visual::new(BeatType::StepReveal).with("latex", "x").with("step_number", 1)),
            beat(
                "b6",
                Visual::new(BeatType::GraphPlot)
                    .with("functions", json!([{"expr": "x**2"}]))
                    .with("x_range", json!([-3, 3]))
                    .with("y_range", json!([0, 9])),
            ),
            beat(
                "b7",
                Visual::new(BeatType::GraphAnimate)
                    .with("function_expr", "np.sin(t*x)")
                    .with("parameter", "t")
                    .with("range", json!([0, 5])),
            ),
            beat("b8", Visual::new(BeatType::VectorShow).with("vectors", json!([]))),
            beat(
                "b9",
                Visual::new(BeatType::VectorTransform)
                    .with("matrix", json!([[2, 0], [0, 1]]))
                    .with("vectors", json!([[1, 0]])),
            ),
            beat("b10", Visual::new(BeatType::MatrixDisplay).with("matrix_values", json!([[1]]))),
            beat("b11", Visual::new(BeatType::SummaryCard).with("key_points", json!(["a"]))),
            beat(
                "b12",
                Visual::new(BeatType::TheoremCard)
                    .with("theorem_name", "Spectral")
                    .with("statement_latex", "A = Q\\Lambda Q^T"),
            ),
            beat("b13", Visual::new(BeatType::TextCard).with("text", "hi")),
            beat("b14", Visual::new(BeatType::Pause)),
        ];
        assert!(validate_beats(&beats).is_empty());
    }

    #[test]
    fn missing_id_and_narration() {
        let b = Beat {
            beat_id: String::new(),
            narration: "   ".into(),
            visual: Some(Visual::new(BeatType::Pause)),
        };
        let errors = validate_beat(&b);
        assert_eq!(errors[0], "Beat missing 'beat_id'");
        assert_eq!(errors[1], "Beat '?': empty narration");
    }

    #[test]
    fn missing_visual_stops_checks() {
        let b = Beat {
            beat_id: "x_1".into(),
            narration: "n".into(),
            visual: None,
        };
        assert_eq!(validate_beat(&b), vec!["Beat 'x_1': missing 'visual'"]);

        let empty = Beat {
            visual: Some(Visual::default()),
            ..b
        };
        assert_eq!(validate_beat(&empty), vec!["Beat 'x_1': missing 'visual'"]);
    }

    #[test]
    fn unknown_type_lists_allowed() {
        let mut v = Visual::default();
        v.kind = Some("bar_chart".into());
        let errors = validate_beat(&beat("x_1", v));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Beat 'x_1': unknown visual type 'bar_chart'. Allowed: ['equation_reveal'"));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let errors = validate_beat(&beat("h_1", Visual::new(BeatType::Highlight).with("target", "x")));
        assert_eq!(errors, vec!["Beat 'h_1' (highlight): missing required field 'color'"]);
    }

    #[test]
    fn unbalanced_latex_is_reported_and_truncated() {
        let latex = format!(r"\frac{{a}}{{b{}", "x".repeat(200));
        let errors = validate_beat(&beat("e_1", Visual::new(BeatType::EquationReveal).with("latex", latex.clone())));
        assert_eq!(errors.len(), 1);
        let expected: String = latex.chars().take(80).collect();
        assert_eq!(errors[0], format!("Beat 'e_1': unbalanced braces in 'latex': {}", expected));
    }

    #[test]
    fn statement_latex_and_from_latex_are_checked() {
        let t = Visual::new(BeatType::TheoremCard)
            .with("theorem_name", "T")
            .with("statement_latex", "{");
        assert_eq!(validate_beat(&beat("t", t)).len(), 1);

        let e = Visual::new(BeatType::EquationTransform)
            .with("from_latex", "}")
            .with("to_latex", "x");
        assert!(validate_beat(&beat("e", e))[0].contains("'from_latex'"));
    }

    #[test]
    fn latex_in_narration_is_ignored() {
        let b = Beat::new("n_1", r"Consider \frac{a}{", Visual::new(BeatType::Pause));
        assert!(validate_beat(&b).is_empty());
    }

    #[test]
    fn empty_latex_passes_brace_check() {
        let b = beat("e_1", Visual::new(BeatType::EquationReveal).with("latex", ""));
        assert!(validate_beat(&b).is_empty());
    }

    #[test]
    fn duplicate_ids_are_reported_once_per_repeat() {
        let v = Visual::new(BeatType::Pause);
        let beats = vec![beat("a", v.clone()), beat("a", v.clone()), beat("b", v)];
        assert_eq!(validate_beats(&beats), vec!["Duplicate beat_id: 'a'"]);
    }

    fn chapter(id: &str, title: &str, n: serde_json::Value) -> Chapter {
        Chapter {
            id: id.into(),
            title: title.into(),
            n_beats: Some(n),
            ..Default::default()
        }
    }

    #[test]
    fn outline_valid() {
        let outline = Outline {
            title: "Eigenvalues".into(),
            total_duration_mins: Some(5.0),
            chapters: vec![chapter("motivation", "Why", json!(3)), chapter("def", "What", json!(2))],
        };
        assert!(validate_outline(&outline).is_empty());
    }

    #[test]
    fn outline_without_chapters() {
        let outline = Outline::default();
        assert_eq!(
            validate_outline(&outline),
            vec!["Outline missing 'title'", "Outline has no 'chapters'"]
        );
    }

    #[test]
    fn outline_chapter_errors() {
        let outline = Outline {
            title: "T".into(),
            total_duration_mins: None,
            chapters: vec![
                chapter("", "No id", json!(1)),
                chapter("dup", "A", json!(0)),
                chapter("dup", "", json!("3")),
                Chapter {
                    id: "c".into(),
                    title: "C".into(),
                    ..Default::default()
                },
            ],
        };
        let errors = validate_outline(&outline);
        assert_eq!(
            errors,
            vec![
                "Chapter 0: missing 'id'",
                "Chapter 'dup': 'n_beats' must be a positive integer, got 0",
                "Duplicate chapter id: 'dup'",
                "Chapter 'dup': missing 'title'",
                "Chapter 'dup': 'n_beats' must be a positive integer, got \"3\"",
                "Chapter 'c': missing 'n_beats'",
            ]
        );
    }
}
