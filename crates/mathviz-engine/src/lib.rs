//! Planning and job execution for mathviz.
//!
//! - [`Planner`] - Two-phase LLM planning: outline, then beats per chapter
//! - [`Pipeline`] - Plan → narrate → render → compose → upload for one job
//! - [`JobStore`] - In-memory job registry behind the HTTP API
//! - [`prompts`] - System prompts and response formats for both phases
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mathviz_engine::{JobRequest, JobStore, Pipeline};
//!
//! let jobs = Arc::new(JobStore::new());
//! let pipeline = Pipeline::new(settings.clone(), Arc::clone(&jobs)).with_llm(llm);
//!
//! let job = jobs.create("eigenvalues of a 2x2 matrix").await;
//! pipeline.run_job(&job.job_id, &request).await;
//! println!("{:?}", jobs.get(&job.job_id).await.map(|j| j.status));
//! ```

mod jobs;
mod pipeline;
mod planner;
pub mod prompts;

pub use jobs::{new_job_id, Job, JobStatus, JobStore};
pub use pipeline::{
    duration_for, JobRequest, Pipeline, RenderOptions, RenderSummary, NO_AUDIO_DURATION_SECS,
};
pub use planner::{
    assemble_plan, fallback_beats, min_chapters, strip_fences, target_beats, unwrap_beat_array,
    Planner,
};
