//! Two-phase scene planning.
//!
//! Phase one asks the LLM for a chapter outline. Phase two generates the
//! beats of every chapter concurrently, then the planner stitches them into
//! one flat list with code-controlled separator and closing beats.

use std::sync::Arc;

use futures::future::join_all;
use mathviz_config::Settings;
use mathviz_core::validator::{validate_beats, validate_outline};
use mathviz_core::{Beat, BeatType, Chapter, EngineError, Outline, Plan, Visual};
use mathviz_llm::{CompletionRequest, LlmBackend};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::prompts::{
    closing_narration, separator_narration, CHAPTER_JSON_FORMAT, CHAPTER_SYSTEM_PROMPT,
    OUTLINE_JSON_FORMAT, OUTLINE_SYSTEM_PROMPT,
};

const MAX_OUTLINE_ATTEMPTS: usize = 3;
const MAX_CHAPTER_ATTEMPTS: usize = 3;
const OUTLINE_TEMPERATURE: f32 = 0.6;
const CHAPTER_TEMPERATURE: f32 = 0.7;
const SECONDS_PER_BEAT: u64 = 15;
const MIN_TARGET_BEATS: usize = 12;

const WRAPPER_KEYS: [&str; 4] = ["beats", "chapter_beats", "items", "data"];

/// Removes a surrounding ```` ``` ```` or ```` ```json ```` fence from LLM output.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    inner.strip_prefix("json").unwrap_or(inner).trim()
}

/// Beat count a video of `duration_mins` should reach at ~15 s per beat.
pub fn target_beats(duration_mins: u32) -> usize {
    let beats = u64::from(duration_mins).saturating_mul(60) / SECONDS_PER_BEAT;
    usize::try_from(beats).unwrap_or(usize::MAX).max(MIN_TARGET_BEATS)
}

/// Chapters the outline must contain to reach `target` beats.
pub fn min_chapters(target: usize, max_beats_per_chapter: usize) -> usize {
    let per = max_beats_per_chapter.max(1) as f64;
    let chapters = (target as f64 / per).round_ties_even() as usize;
    chapters.clamp(3, 6)
}

fn language_name(language: &str) -> &str {
    match language {
        "hi" => "Hindi",
        other => other,
    }
}

/// Pulls the beat array out of a chapter response.
///
/// JSON-object mode providers wrap arrays, so an object is unwrapped via the
/// first list under a known key, falling back to its first value.
pub fn unwrap_beat_array(parsed: Value) -> Result<Vec<Beat>, EngineError> {
    let parsed = match parsed {
        Value::Object(mut map) => {
            let key = WRAPPER_KEYS
                .iter()
                .find(|k| map.get(**k).is_some_and(Value::is_array));
            match key {
                Some(k) => map.remove(*k).unwrap_or_default(),
                None => map.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Array(Vec::new())),
            }
        }
        other => other,
    };

    if !parsed.is_array() {
        return Err(EngineError::Parse(format!(
            "Expected a JSON array, got {}",
            json_kind(&parsed)
        )));
    }
    Ok(serde_json::from_value(parsed)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn chapter_summary(chapter: &Chapter) -> String {
    format!("{} ({})", chapter.title, chapter.concepts.join(", "))
}

/// Single text card used when every attempt for a chapter failed.
pub fn fallback_beats(chapter: &Chapter) -> Vec<Beat> {
    let title = if chapter.title.is_empty() { "Chapter" } else { chapter.title.as_str() };
    let cid = if chapter.id.is_empty() { "chapter" } else { chapter.id.as_str() };
    vec![Beat::new(
        format!("{}_1", cid),
        format!("This section covers {}.", title),
        Visual::new(BeatType::TextCard).with("text", title),
    )]
}

/// Joins chapter beats into the final plan, adding separators and the closing beat.
pub fn assemble_plan(outline: &Outline, chapter_beats: Vec<Vec<Beat>>, language: &str) -> Plan {
    let n_chapters = outline.chapters.len();
    let mut beats = Vec::new();

    for (i, (chapter, chapter_beats)) in outline.chapters.iter().zip(chapter_beats).enumerate() {
        if i > 0 {
            beats.push(Beat::new(
                format!("ch{}_intro", i + 1),
                separator_narration(language).replace("{title}", &chapter.title),
                Visual::new(BeatType::TitleCard)
                    .with("title", chapter.title.as_str())
                    .with("subtitle", format!("Part {} of {}", i + 1, n_chapters)),
            ));
        }
        beats.extend(chapter_beats);
    }

    let key_points: Vec<Value> = outline
        .chapters
        .iter()
        .map(|c| Value::String(c.title.clone()))
        .collect();
    beats.push(Beat::new(
        "closing_summary",
        closing_narration(language).replace("{video_title}", &outline.title),
        Visual::new(BeatType::SummaryCard).with("key_points", key_points),
    ));

    Plan {
        title: outline.title.clone(),
        beats,
    }
}

/// Drives both planning phases against one LLM backend.
pub struct Planner {
    llm: Arc<dyn LlmBackend>,
    max_beats_per_chapter: usize,
    chapter_output_tokens: u32,
    outline_output_tokens: u32,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmBackend>, settings: &Settings) -> Self {
        Self {
            llm,
            max_beats_per_chapter: settings.max_beats_per_chapter,
            chapter_output_tokens: settings.max_chapter_output_tokens,
            outline_output_tokens: settings.outline_output_tokens,
        }
    }

    /// Phase one: the chapter outline, retried until it validates.
    pub async fn generate_outline(
        &self,
        topic: &str,
        language: &str,
        duration_mins: u32,
    ) -> Result<Outline, EngineError> {
        let lang_note = if language == "en" {
            String::new()
        } else {
            format!(
                "\nIMPORTANT: Write all 'title' and 'concepts' values in {}.",
                language_name(language)
            )
        };
        let target = target_beats(duration_mins);
        let needed = min_chapters(target, self.max_beats_per_chapter);

        let prompt = format!(
            "Create a chapter outline for a {mins}-minute video about: {topic}{lang_note}\n\n\
             Pacing target: ~{target} beats total ({mins} min at 15 s per beat). \
             You MUST produce exactly {needed} chapters.\n\n{format}",
            mins = duration_mins,
            topic = topic,
            lang_note = lang_note,
            target = target,
            needed = needed,
            format = OUTLINE_JSON_FORMAT,
        );
        let request = CompletionRequest::new(OUTLINE_SYSTEM_PROMPT, prompt)
            .max_tokens(self.outline_output_tokens)
            .temperature(OUTLINE_TEMPERATURE)
            .label("outline");

        info!("Outline for '{}' ({} min)", truncate(topic, 60), duration_mins);

        let mut last_error = String::new();
        for attempt in 1..=MAX_OUTLINE_ATTEMPTS {
            match self.try_outline(&request, needed, duration_mins).await {
                Ok(outline) => {
                    info!(
                        "Outline: '{}', {} chapters (attempt {})",
                        outline.title,
                        outline.chapters.len(),
                        attempt
                    );
                    return Ok(outline);
                }
                Err(e) => {
                    warn!("Outline attempt {}/{} failed: {}", attempt, MAX_OUTLINE_ATTEMPTS, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(EngineError::Llm(format!(
            "Outline failed after {} attempts: {}",
            MAX_OUTLINE_ATTEMPTS, last_error
        )))
    }

    async fn try_outline(
        &self,
        request: &CompletionRequest,
        needed: usize,
        duration_mins: u32,
    ) -> Result<Outline, EngineError> {
        let response = self.llm.complete(request).await?;
        let raw = strip_fences(&response.content);
        debug!("Outline response ({} chars): {}", raw.len(), truncate(raw, 400));

        let outline: Outline = serde_json::from_str(raw)?;

        let errors = validate_outline(&outline);
        if !errors.is_empty() {
            return Err(EngineError::Validation(format!(
                "Outline validation failed:\n{}",
                errors.join("\n")
            )));
        }
        if outline.chapters.len() < needed {
            return Err(EngineError::Validation(format!(
                "Outline has {} chapters but need at least {} for a {}-min video",
                outline.chapters.len(),
                needed,
                duration_mins
            )));
        }
        Ok(outline)
    }

    /// Phase two for one chapter. Never fails: exhausted retries yield [`fallback_beats`].
    pub async fn generate_chapter_beats(
        &self,
        chapter: &Chapter,
        outline: &Outline,
        language: &str,
    ) -> Vec<Beat> {
        let cid = if chapter.id.is_empty() { "chapter" } else { chapter.id.as_str() };
        let n_beats = self.max_beats_per_chapter;
        let request = CompletionRequest::new(CHAPTER_SYSTEM_PROMPT, chapter_prompt(chapter, outline, language, n_beats))
            .max_tokens(self.chapter_output_tokens)
            .temperature(CHAPTER_TEMPERATURE)
            .label(format!("chapter:{}", cid));

        for attempt in 1..=MAX_CHAPTER_ATTEMPTS {
            info!("Chapter '{}' ({} beats, attempt {})", cid, n_beats, attempt);
            match self.try_chapter(&request).await {
                Ok(beats) => {
                    info!("Chapter '{}': {} beats generated", cid, beats.len());
                    return beats;
                }
                Err(e) => warn!(
                    "Chapter '{}' attempt {}/{} failed: {}",
                    cid, attempt, MAX_CHAPTER_ATTEMPTS, e
                ),
            }
        }

        error!("Chapter '{}': all retries exhausted, using fallback", cid);
        fallback_beats(chapter)
    }

    async fn try_chapter(&self, request: &CompletionRequest) -> Result<Vec<Beat>, EngineError> {
        let response = self.llm.complete(request).await?;
        let parsed: Value = serde_json::from_str(strip_fences(&response.content))?;
        let beats = unwrap_beat_array(parsed)?;

        let errors = validate_beats(&beats);
        if !errors.is_empty() {
            let shown: Vec<&str> = errors.iter().take(5).map(String::as_str).collect();
            return Err(EngineError::Validation(format!(
                "Beat validation errors:\n{}",
                shown.join("\n")
            )));
        }
        Ok(beats)
    }

    /// Outline, then every chapter concurrently, assembled into one plan.
    pub async fn generate_scene_plan(
        &self,
        topic: &str,
        language: &str,
        duration_mins: u32,
    ) -> Result<Plan, EngineError> {
        let outline = self.generate_outline(topic, language, duration_mins).await?;

        let chapter_beats = join_all(
            outline
                .chapters
                .iter()
                .map(|chapter| self.generate_chapter_beats(chapter, &outline, language)),
        )
        .await;

        let plan = assemble_plan(&outline, chapter_beats, language);
        info!(
            "Plan complete: '{}', {} chapters, {} beats",
            plan.title,
            outline.chapters.len(),
            plan.beats.len()
        );
        Ok(plan)
    }
}

fn chapter_prompt(chapter: &Chapter, outline: &Outline, language: &str, n_beats: usize) -> String {
    let chapters = &outline.chapters;
    let idx = chapters.iter().position(|c| c.id == chapter.id);
    let prev = idx.filter(|&i| i > 0).map(|i| &chapters[i - 1]);
    let next = idx.and_then(|i| chapters.get(i + 1));

    let prev_note = match prev {
        Some(p) => format!("Previous chapter covered: {}. ", chapter_summary(p)),
        None => "This is the first chapter, open with a strong hook.\n".to_string(),
    };
    let next_note = match next {
        Some(n) => format!("Next chapter will cover: {}. ", chapter_summary(n)),
        None => "This is the last chapter, end with a memorable summary.".to_string(),
    };
    let lang_note = if language == "en" {
        String::new()
    } else {
        format!(
            "\nIMPORTANT: Write all narration in {}. Keep LaTeX in English.",
            language_name(language)
        )
    };

    let title = if chapter.title.is_empty() { "Chapter" } else { chapter.title.as_str() };
    let cid = if chapter.id.is_empty() { "chapter" } else { chapter.id.as_str() };
    let role = chapter.role();
    let total_mins = outline.total_duration_mins.unwrap_or(5.0);

    format!(
        "Generate exactly {n_beats} beats for the '{title}' chapter of a {total_mins}-minute video about '{video}'.\n\
         Chapter role: {role_upper}. Follow the '{role}' beat arc from the system prompt.\n\
         This chapter covers: {concepts}.\n\n\
         {prev_note}{next_note}{lang_note}\n\n\
         Use beat_ids: '{cid}_1', '{cid}_2', ...\n\n\
         {format}",
        n_beats = n_beats,
        title = title,
        total_mins = total_mins,
        video = outline.title,
        role_upper = role.to_uppercase(),
        role = role,
        concepts = chapter.concepts.join(", "),
        prev_note = prev_note,
        next_note = next_note,
        lang_note = lang_note,
        cid = cid,
        format = CHAPTER_JSON_FORMAT,
    )
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use mathviz_llm::{LlmMetrics, LlmResponse};
    use serde_json::json;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, EngineError> + Send + Sync>;

    /// Backend answering from a closure and recording every request.
    pub(crate) struct ScriptedLlm {
        respond: Responder,
        pub calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(
            respond: impl Fn(&CompletionRequest) -> Result<String, EngineError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, label_prefix: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.label.starts_with(label_prefix))
                .count()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, EngineError> {
            self.calls.lock().unwrap().push(request.clone());
            let content = (self.respond)(request)?;
            Ok(LlmResponse {
                content,
                metrics: LlmMetrics::default(),
            })
        }

        fn provider(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }
    }

    pub(crate) fn outline_json(n: usize) -> String {
        let chapters: Vec<Value> = (0..n)
            .map(|i| {
                json!({
                    "id": format!("c{}", i + 1),
                    "title": format!("Chapter {}", i + 1),
                    "concepts": ["a", "b"],
                    "n_beats": 4,
                    "role": "how"
                })
            })
            .collect();
        json!({"title": "Eigenvalues", "total_duration_mins": 5, "chapters": chapters}).to_string()
    }

    pub(crate) fn chapter_json(cid: &str) -> String {
        json!({
            "beats": [
                {"beat_id": format!("{}_1", cid), "narration": "Look.", "visual": {"type": "text_card", "text": "Hi"}},
                {"beat_id": format!("{}_2", cid), "narration": "Then.", "visual": {"type": "equation_reveal", "latex": "\\frac{a}{b}"}}
            ]
        })
        .to_string()
    }

    pub(crate) fn chapter_id(request: &CompletionRequest) -> String {
        request.label.trim_start_matches("chapter:").to_string()
    }

    fn planner(llm: Arc<ScriptedLlm>) -> Planner {
        Planner::new(llm, &Settings::default())
    }

    fn chapter(id: &str, title: &str) -> Chapter {
        Chapter {
            id: id.into(),
            title: title.into(),
            concepts: vec!["x".into()],
            n_beats: Some(json!(3)),
            role: Some("example".into()),
        }
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_fences("```\n[1, 2]\n```\ntrailing"), "[1, 2]");
        assert_eq!(strip_fences("```json\n[1]"), "[1]");
    }

    #[test]
    fn pacing_arithmetic() {
        assert_eq!(target_beats(5), 20);
        assert_eq!(target_beats(3), 12);
        assert_eq!(target_beats(1), 12);
        assert_eq!(target_beats(10), 40);
        assert_eq!(target_beats(80_000_000), 320_000_000);
        assert!(target_beats(u32::MAX) > target_beats(80_000_000));
        assert_eq!(min_chapters(target_beats(u32::MAX), 5), 6);

        assert_eq!(min_chapters(20, 5), 4);
        assert_eq!(min_chapters(12, 5), 3);
        assert_eq!(min_chapters(40, 5), 6);
        assert_eq!(min_chapters(20, 0), 6);
    }

    #[test]
    fn unwraps_known_wrapper_keys() {
        let beats = unwrap_beat_array(json!({"meta": 1, "items": [{"beat_id": "x_1"}]})).unwrap();
        assert_eq!(beats[0].beat_id, "x_1");

        let beats = unwrap_beat_array(json!([{"beat_id": "y_1"}, {"beat_id": "y_2"}])).unwrap();
        assert_eq!(beats.len(), 2);

        let beats = unwrap_beat_array(json!({"whatever": [{"beat_id": "z_1"}]})).unwrap();
        assert_eq!(beats[0].beat_id, "z_1");

        assert!(unwrap_beat_array(json!({})).unwrap().is_empty());
        let err = unwrap_beat_array(json!("nope")).unwrap_err();
        assert!(err.to_string().contains("Expected a JSON array, got string"));
    }

    #[test]
    fn fallback_is_single_text_card() {
        let beats = fallback_beats(&chapter("intro", "Why care"));
        assert_eq!(beats.len(), 1);
        assert_eq!(beats[0].beat_id, "intro_1");
        assert_eq!(beats[0].narration, "This section covers Why care.");
        assert_eq!(beats[0].visual_type(), "text_card");
        assert_eq!(beats[0].visual.as_ref().unwrap().str_field("text"), Some("Why care"));
    }

    #[test]
    fn assembly_inserts_separators_and_closing() {
        let outline = Outline {
            title: "Eigenvalues".into(),
            total_duration_mins: Some(5.0),
            chapters: vec![chapter("a", "First"), chapter("b", "Second"), chapter("c", "Third")],
        };
        let per_chapter = outline.chapters.iter().map(fallback_beats).collect();

        let plan = assemble_plan(&outline, per_chapter, "en");
        let ids: Vec<&str> = plan.beats.iter().map(|b| b.beat_id.as_str()).collect();
        assert_eq!(ids, vec!["a_1", "ch2_intro", "b_1", "ch3_intro", "c_1", "closing_summary"]);

        let sep = plan.beats[1].visual.as_ref().unwrap();
        assert_eq!(sep.str_field("subtitle"), Some("Part 2 of 3"));
        assert_eq!(sep.str_field("title"), Some("Second"));
        assert!(plan.beats[1].narration.contains("Second"));

        let closing = &plan.beats[5];
        assert_eq!(closing.visual_type(), "summary_card");
        assert_eq!(
            closing.visual.as_ref().unwrap().get("key_points"),
            Some(&json!(["First", "Second", "Third"]))
        );
        assert!(closing.narration.contains("Eigenvalues"));
        assert_eq!(plan.title, "Eigenvalues");
    }

    #[test]
    fn hindi_assembly_uses_hindi_narration() {
        let outline = Outline {
            title: "T".into(),
            total_duration_mins: None,
            chapters: vec![chapter("a", "A"), chapter("b", "B")],
        };
        let plan = assemble_plan(&outline, vec![vec![], vec![]], "hi");
        assert!(plan.beats[0].narration.starts_with("अब हम"));
    }

    #[tokio::test]
    async fn outline_retries_until_enough_chapters() {
        let attempts = Mutex::new(0);
        let llm = Arc::new(ScriptedLlm::new(move |_| {
            let mut n = attempts.lock().unwrap();
            *n += 1;
            Ok(match *n {
                1 => "not json".to_string(),
                2 => outline_json(2),
                _ => format!("```json\n{}\n```", outline_json(4)),
            })
        }));

        let outline = planner(Arc::clone(&llm))
            .generate_outline("eigenvalues", "hi", 5)
            .await
            .unwrap();
        assert_eq!(outline.chapters.len(), 4);
        assert_eq!(llm.count("outline"), 3);

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].user.contains("You MUST produce exactly 4 chapters"));
        assert!(calls[0].user.contains("in Hindi"));
        assert_eq!(calls[0].temperature, 0.6);
    }

    #[tokio::test]
    async fn outline_gives_up_after_three_attempts() {
        let llm = Arc::new(ScriptedLlm::new(|_| Ok(outline_json(1))));
        let err = planner(Arc::clone(&llm))
            .generate_outline("topic", "en", 5)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Llm(_)));
        assert!(err.to_string().contains("Outline failed after 3 attempts"));
        assert_eq!(llm.count("outline"), 3);
    }

    #[tokio::test]
    async fn chapter_prompt_carries_neighbours_and_ids() {
        let outline: Outline = serde_json::from_str(&outline_json(3)).unwrap();
        let llm = Arc::new(ScriptedLlm::new(|r| Ok(chapter_json(&chapter_id(r)))));
        let p = planner(Arc::clone(&llm));

        let beats = p.generate_chapter_beats(&outline.chapters[0], &outline, "en").await;
        assert_eq!(beats.len(), 2);
        assert_eq!(beats[0].beat_id, "c1_1");

        let beats = p.generate_chapter_beats(&outline.chapters[2], &outline, "en").await;
        assert_eq!(beats[1].beat_id, "c3_2");

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].user.contains("first chapter, open with a strong hook"));
        assert!(calls[0].user.contains("Next chapter will cover: Chapter 2 (a, b)"));
        assert!(calls[0].user.contains("Chapter role: HOW"));
        assert!(calls[0].user.contains("'c1_1', 'c1_2'"));
        assert!(!calls[0].user.contains("IMPORTANT"));
        assert!(calls[1].user.contains("Previous chapter covered: Chapter 2"));
        assert!(calls[1].user.contains("last chapter, end with a memorable summary"));
        assert_eq!(calls[1].label, "chapter:c3");
    }

    #[tokio::test]
    async fn invalid_chapter_falls_back_after_retries() {
        let outline: Outline = serde_json::from_str(&outline_json(3)).unwrap();
        let llm = Arc::new(ScriptedLlm::new(|_| {
            Ok(json!([{"beat_id": "c1_1", "narration": "x", "visual": {"type": "highlight"}}]).to_string())
        }));

        let beats = planner(Arc::clone(&llm))
            .generate_chapter_beats(&outline.chapters[0], &outline, "en")
            .await;
        assert_eq!(beats, fallback_beats(&outline.chapters[0]));
        assert_eq!(llm.count("chapter:"), 3);
    }

    #[tokio::test]
    async fn scene_plan_end_to_end() {
        let llm = Arc::new(ScriptedLlm::new(|r| {
            if r.label == "outline" {
                Ok(outline_json(4))
            } else {
                Ok(chapter_json(&chapter_id(r)))
            }
        }));

        let plan = planner(llm).generate_scene_plan("eigenvalues", "en", 5).await.unwrap();
        // 4 chapters x 2 beats + 3 separators + closing
        assert_eq!(plan.beats.len(), 12);
        assert_eq!(plan.beats[0].beat_id, "c1_1");
        assert_eq!(plan.beats[2].beat_id, "ch2_intro");
        assert_eq!(plan.beats.last().unwrap().beat_id, "closing_summary");
        assert!(validate_beats(&plan.beats).is_empty());
    }

    #[tokio::test]
    async fn llm_errors_count_as_failed_attempts() {
        let llm = Arc::new(ScriptedLlm::new(|_| Err(EngineError::Llm("503".into()))));
        let err = planner(llm).generate_scene_plan("t", "en", 5).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
