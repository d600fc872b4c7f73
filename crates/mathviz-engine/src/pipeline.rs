//! End-to-end job execution.
//!
//! A job walks the stages plan → narrate → build scenes → render → compose →
//! upload, reporting each one through the [`JobStore`]. Individual beats may
//! drop out along the way; the job only fails when a whole stage produces
//! nothing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use mathviz_config::{Quality, Settings};
use mathviz_core::validator::validate_beats;
use mathviz_core::{Beat, EngineError};
use mathviz_llm::LlmBackend;
use mathviz_render::command::head;
use mathviz_render::{build_all_scene_files, Composer, ManimRenderer, RenderTask, SceneStyle};
use mathviz_storage::{plan_key, R2Storage};
use mathviz_tts::{generate_all_audio, AudioCache, AudioClip, SarvamClient, SpeechSynthesizer};
use tracing::{error, info, warn};

use crate::jobs::{JobStatus, JobStore};
use crate::planner::Planner;

/// Beat length used when a beat has no usable narration audio.
pub const NO_AUDIO_DURATION_SECS: f64 = 8.0;

const FIRST_ERROR_CHARS: usize = 300;

/// What a client asked to have generated.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub topic: String,
    pub language: String,
    pub duration_mins: u32,
    pub quality: Quality,
    pub voice: String,
}

/// Per-run knobs for [`Pipeline::render_plan`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub quality: Quality,
    pub voice: String,
    pub language: String,
}

impl From<&JobRequest> for RenderOptions {
    fn from(request: &JobRequest) -> Self {
        Self {
            quality: request.quality,
            voice: request.voice.clone(),
            language: request.language.clone(),
        }
    }
}

/// Result of rendering a plan to a final video.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub final_path: PathBuf,
    pub video_url: String,
    pub beats_rendered: usize,
    pub beats_dropped: usize,
    pub drop_reasons: Vec<String>,
    pub render_errors: HashMap<String, String>,
}

/// Scene length for a beat: its narration length, never below `min_duration`.
pub fn duration_for(clip: Option<&AudioClip>, min_duration: f64) -> f64 {
    let tts = clip
        .map(|c| c.duration)
        .filter(|d| *d > 0.0)
        .unwrap_or(NO_AUDIO_DURATION_SECS);
    tts.max(min_duration)
}

fn round1(secs: f64) -> f64 {
    (secs * 10.0).round() / 10.0
}

pub struct Pipeline {
    settings: Arc<Settings>,
    planner: Option<Planner>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    storage: Option<R2Storage>,
    renderer: ManimRenderer,
    composer: Composer,
    jobs: Arc<JobStore>,
}

impl Pipeline {
    /// A pipeline that can render saved plans. Add an LLM with [`Pipeline::with_llm`]
    /// to run full jobs.
    pub fn new(settings: Arc<Settings>, jobs: Arc<JobStore>) -> Self {
        Self {
            renderer: ManimRenderer::from_settings(&settings),
            composer: Composer::from_settings(&settings),
            settings,
            planner: None,
            synthesizer: None,
            storage: None,
            jobs,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmBackend>) -> Self {
        self.planner = Some(Planner::new(llm, &self.settings));
        self
    }

    pub fn with_storage(mut self, storage: Option<R2Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Uses `synthesizer` for every job instead of a per-job Sarvam client.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Runs a queued job to completion, recording the outcome in the job store.
    pub async fn run_job(&self, job_id: &str, request: &JobRequest) {
        let started = Instant::now();

        match self.execute(job_id, request).await {
            Ok(summary) => {
                let render_time = round1(started.elapsed().as_secs_f64());
                info!("[{}] Done in {:.1}s -> {}", job_id, render_time, summary.final_path.display());
                self.jobs
                    .update(job_id, |job| {
                        job.status = JobStatus::Completed;
                        job.video_url = Some(summary.video_url);
                        job.render_time_seconds = Some(render_time);
                        job.beats_rendered = Some(summary.beats_rendered);
                        job.beats_dropped = Some(summary.beats_dropped);
                        job.drop_reasons = (!summary.drop_reasons.is_empty()).then_some(summary.drop_reasons);
                    })
                    .await;
            }
            Err(e) => {
                error!("[{}] Pipeline failed: {}", job_id, e);
                let render_time = round1(started.elapsed().as_secs_f64());
                self.jobs
                    .update(job_id, |job| {
                        job.status = JobStatus::Failed;
                        job.error = Some(e.to_string());
                        job.render_time_seconds = Some(render_time);
                    })
                    .await;
            }
        }
    }

    async fn execute(&self, job_id: &str, request: &JobRequest) -> Result<RenderSummary, EngineError> {
        let planner = self
            .planner
            .as_ref()
            .ok_or_else(|| EngineError::Config("No LLM backend configured".into()))?;
        self.composer.verify_ffmpeg().await?;

        info!(
            "[{}] Planning '{}' ({} min, {})",
            job_id,
            head(&request.topic, 60),
            request.duration_mins,
            request.language
        );
        self.jobs.set_status(job_id, JobStatus::Planning).await;

        let plan = planner
            .generate_scene_plan(&request.topic, &request.language, request.duration_mins)
            .await?;
        info!("[{}] Plan: '{}', {} beats", job_id, plan.title, plan.beats.len());

        if let Some(storage) = &self.storage {
            let uploaded = match serde_json::to_value(&plan) {
                Ok(value) => storage.upload_json(&value, &plan_key(job_id)).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = uploaded {
                warn!("[{}] R2 plan upload failed (non-fatal): {}", job_id, e);
            }
        }

        let errors = validate_beats(&plan.beats);
        if !errors.is_empty() {
            let shown: Vec<&str> = errors.iter().take(10).map(String::as_str).collect();
            warn!("[{}] Validation warnings:\n{}", job_id, shown.join("\n"));
        }

        let total = plan.beats.len();
        let title = plan.title.clone();
        self.jobs
            .update(job_id, |job| {
                job.status = JobStatus::GeneratingAudio;
                job.total_beats = Some(total);
                job.title = Some(title);
            })
            .await;

        self.render_verified(job_id, &plan.beats, &RenderOptions::from(request))
            .await
    }

    fn synthesizer_for(&self, voice: &str) -> Result<Arc<dyn SpeechSynthesizer>, EngineError> {
        if let Some(tts) = &self.synthesizer {
            return Ok(Arc::clone(tts));
        }
        if self.settings.sarvam_api_key.is_empty() {
            return Err(EngineError::Config(
                "SARVAM_API_KEY not set, cannot generate audio".into(),
            ));
        }
        Ok(Arc::new(SarvamClient::new(
            &self.settings.sarvam_api_key,
            voice,
            &self.settings.sarvam_model,
        )))
    }

    /// Narrates, renders and composes `beats` into `final/<job_id>.mp4`.
    ///
    /// Fails before any TTS call when ffmpeg cannot run.
    pub async fn render_plan(
        &self,
        job_id: &str,
        beats: &[Beat],
        options: &RenderOptions,
    ) -> Result<RenderSummary, EngineError> {
        self.composer.verify_ffmpeg().await?;
        self.render_verified(job_id, beats, options).await
    }

    async fn render_verified(
        &self,
        job_id: &str,
        beats: &[Beat],
        options: &RenderOptions,
    ) -> Result<RenderSummary, EngineError> {
        let settings = &self.settings;
        let tts = self.synthesizer_for(&options.voice)?;

        // Narration
        info!("[{}] TTS for {} beats", job_id, beats.len());
        let cache = AudioCache::open(settings.audio_cache_dir()).await?;
        let audio_dir = settings.audio_dir().join(job_id);
        let clips = generate_all_audio(beats, &options.language, tts.as_ref(), &cache, &audio_dir).await?;

        let mut durations = HashMap::new();
        let mut audio_paths = HashMap::new();
        for beat in beats {
            let bid = &beat.beat_id;
            durations.insert(bid.clone(), duration_for(clips.get(bid), settings.min_beat_duration));
            let wav = audio_dir.join(format!("{}.wav", bid));
            if tokio::fs::try_exists(&wav).await.unwrap_or(false) {
                audio_paths.insert(bid.clone(), wav);
            }
        }
        info!("[{}] Audio done for {} beats", job_id, audio_paths.len());

        // Scene modules
        self.jobs.set_status(job_id, JobStatus::BuildingScenes).await;
        let style = SceneStyle::new(&settings.default_theme, &settings.default_accent_color);
        let scene_dir = settings.raw_dir().join("scene_files").join(job_id);
        let scenes = build_all_scene_files(beats, &style, &durations, &audio_paths, &scene_dir).await?;
        info!("[{}] Scene files: {}", job_id, scenes.len());

        // Manim
        self.jobs.set_status(job_id, JobStatus::Rendering).await;
        info!("[{}] Rendering {} beats ({} quality)", job_id, scenes.len(), options.quality);
        let media_dir = settings.raw_dir().join("media").join(job_id);
        let tasks: Vec<RenderTask> = scenes
            .into_iter()
            .map(|scene| RenderTask {
                media_dir: media_dir.join(&scene.beat_id),
                beat_id: scene.beat_id,
                scene_file: scene.path,
                class_name: scene.class_name,
            })
            .collect();

        let (rendered, render_errors) = self
            .renderer
            .render_all_parallel(&tasks, options.quality, settings.max_render_workers)
            .await;

        if rendered.is_empty() {
            let first = beats
                .iter()
                .find_map(|b| render_errors.get(&b.beat_id))
                .map(String::as_str)
                .unwrap_or("unknown");
            return Err(EngineError::Render(format!(
                "All {} beats failed to render. First error: {}",
                beats.len(),
                head(first, FIRST_ERROR_CHARS)
            )));
        }
        if rendered.len() < beats.len() {
            warn!("[{}] {}/{} beats failed to render", job_id, beats.len() - rendered.len(), beats.len());
        }
        let errors_snapshot = render_errors.clone();
        self.jobs
            .update(job_id, |job| job.render_errors = Some(errors_snapshot))
            .await;

        // Merge audio and video per beat, in plan order
        self.jobs.set_status(job_id, JobStatus::Composing).await;
        let merged_dir = settings.raw_dir().join("merged").join(job_id);
        tokio::fs::create_dir_all(&merged_dir)
            .await
            .map_err(|e| EngineError::io(&merged_dir, e))?;

        let merges = beats.iter().filter_map(|beat| {
            let bid = &beat.beat_id;
            let Some(video) = rendered.get(bid) else {
                warn!("[{}] Skipping missing beat: {}", job_id, bid);
                return None;
            };
            let out = merged_dir.join(format!("{}_merged.mp4", bid));
            let audio = audio_paths.get(bid).map(PathBuf::as_path);
            Some(async move { self.composer.merge_segment(video, audio, &out).await })
        });

        let mut segments = Vec::new();
        let mut drop_reasons = Vec::new();
        for result in join_all(merges).await {
            match result {
                Ok(path) => segments.push(path),
                Err(e) => {
                    error!("[{}] Merge failed: {}", job_id, e);
                    drop_reasons.push(e.to_string());
                }
            }
        }
        if segments.is_empty() {
            return Err(EngineError::Compose("No beats merged successfully.".into()));
        }

        // Final video
        info!("[{}] Concatenating {} beats", job_id, segments.len());
        let final_path = settings.final_dir().join(format!("{}.mp4", job_id));
        self.composer.concat_segments(&segments, &final_path, 0.0).await?;

        let video_url = self.publish(job_id, &final_path).await;

        Ok(RenderSummary {
            final_path,
            video_url,
            beats_rendered: segments.len(),
            beats_dropped: beats.len() - segments.len(),
            drop_reasons,
            render_errors,
        })
    }

    /// Re-encodes a final video to `RENDER_RESOLUTION` at `RENDER_FPS` as
    /// `<stem>_<resolution>.mp4` beside it.
    pub async fn encode_delivery(&self, final_path: &Path) -> Result<PathBuf, EngineError> {
        let resolution = &self.settings.render_resolution;
        let stem = final_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "final".to_string());
        let out = final_path.with_file_name(format!("{}_{}.mp4", stem, resolution));
        info!("Encoding {} at {} / {} fps", out.display(), resolution, self.settings.render_fps);
        self.composer
            .encode_final(final_path, &out, resolution, self.settings.render_fps)
            .await
    }

    /// Public URL for the final video: R2 when configured and reachable, else `/output/`.
    async fn publish(&self, job_id: &str, final_path: &Path) -> String {
        let local = format!(
            "/output/{}",
            final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let Some(storage) = &self.storage else {
            return local;
        };

        self.jobs.set_status(job_id, JobStatus::Uploading).await;
        match storage.upload_video(final_path).await {
            Ok(url) => {
                info!("[{}] Uploaded to R2: {}", job_id, url);
                url
            }
            Err(e) => {
                warn!("[{}] R2 upload failed (falling back to local URL): {}", job_id, e);
                local
            }
        }
    }
}
