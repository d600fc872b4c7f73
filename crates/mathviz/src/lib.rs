//! # MathViz: Topic-to-video engine
//!
//! MathViz turns a plain-text math topic into a narrated explainer video.
//! An LLM plans the video as beats, Sarvam voices each narration, Manim
//! renders each visual and FFmpeg stitches the result into one MP4.
//!
//! ## Quick Start: Render a saved plan
//!
//! ```rust,ignore
//! use mathviz::prelude::*;
//! use std::sync::Arc;
//!
//! let settings = Arc::new(Settings::from_env()?);
//! let plan = Plan::from_file("plans/eigenvalues.json")?;
//!
//! let pipeline = Pipeline::new(settings, Arc::new(JobStore::new()));
//! let options = RenderOptions { quality: Quality::Low, voice: "shubh".into(), language: "en".into() };
//! let summary = pipeline.render_plan("demo", &plan.beats, &options).await?;
//! println!("{}", summary.final_path.display());
//! ```
//!
//! ## Quick Start: Plan from a topic
//!
//! ```rust,ignore
//! use mathviz::prelude::*;
//! use std::sync::Arc;
//!
//! let llm = UnifiedLlmClient::new("claude", "claude-opus-4-6", &api_key)?;
//! let planner = Planner::new(Arc::new(llm), &settings);
//! let plan = planner.generate_scene_plan("eigenvalues", "en", 5).await?;
//! ```
//!
//! ## Crate Structure
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`mathviz_core`] | Error type, beats, plans, outlines, validator |
//! | [`mathviz_config`] | Settings and output directory layout |
//! | [`mathviz_llm`] | Anthropic and OpenAI clients |
//! | [`mathviz_tts`] | Sarvam TTS, WAV utilities, audio cache |
//! | [`mathviz_render`] | Scene scripts, Manim renders, FFmpeg composition |
//! | [`mathviz_engine`] | Planner, job store, pipeline |
//! | `mathviz_storage` | Cloudflare R2 uploads (feature `r2`) |
//!
//! ## Beat Types
//!
//! `title_card`, `equation_reveal`, `equation_transform`, `highlight`,
//! `step_reveal`, `graph_plot`, `graph_animate`, `vector_show`,
//! `vector_transform`, `matrix_display`, `summary_card`, `theorem_card`,
//! `text_card` and `pause`.

// Re-export core types
pub use mathviz_core::{validator, Beat, BeatType, Chapter, EngineError, Outline, Plan, Visual};

// Re-export config
pub use mathviz_config::{ConfigError, Quality, Settings};

// Re-export LLM clients
pub use mathviz_llm::{CompletionRequest, LlmBackend, LlmMetrics, LlmResponse, UnifiedLlmClient};

// Re-export TTS
pub use mathviz_tts::{AudioCache, AudioClip, SarvamClient, SpeechSynthesizer};

// Re-export rendering
pub use mathviz_render::{Composer, ManimRenderer, RenderTask, SceneFile, SceneStyle};

// Re-export engine
pub use mathviz_engine::{
    Job, JobRequest, JobStatus, JobStore, Pipeline, Planner, RenderOptions, RenderSummary,
};

#[cfg(feature = "r2")]
pub use mathviz_storage::R2Storage;

// Provider-specific clients (hidden, use UnifiedLlmClient instead)
#[doc(hidden)]
pub use mathviz_llm::{AnthropicClient, OpenAiClient};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use mathviz::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::{Beat, BeatType, EngineError, Plan, Visual};

    // Config
    pub use crate::{Quality, Settings};

    // LLM
    pub use crate::{LlmBackend, UnifiedLlmClient};

    // Engine
    pub use crate::{JobStatus, JobStore, Pipeline, Planner, RenderOptions};
}
