//! Job submission and status lookup.

use std::path::Path;
use std::sync::Arc;

use mathviz_config::Quality;
use mathviz_engine::{Job, JobRequest, JobStatus};
use tracing::info;

use crate::dto::{GenerateRequest, RecoveredStatus};
use crate::error::AppError;
use crate::ServerState;

const MIN_TOPIC_CHARS: usize = 3;
const DURATION_RANGE_MINS: std::ops::RangeInclusive<u32> = 3..=10;

/// Fills request defaults from settings and rejects unusable input.
pub fn to_job_request(state: &ServerState, request: GenerateRequest) -> Result<JobRequest, AppError> {
    let topic = request.topic.trim().to_string();
    if topic.chars().count() < MIN_TOPIC_CHARS {
        return Err(AppError::BadRequest(format!(
            "topic must be at least {} characters",
            MIN_TOPIC_CHARS
        )));
    }

    if !DURATION_RANGE_MINS.contains(&request.duration_mins) {
        return Err(AppError::BadRequest(format!(
            "duration_mins must be between {} and {}",
            DURATION_RANGE_MINS.start(),
            DURATION_RANGE_MINS.end()
        )));
    }

    let settings = &state.settings;
    Ok(JobRequest {
        topic,
        language: request.language.unwrap_or_else(|| settings.default_language.clone()),
        duration_mins: request.duration_mins,
        quality: Quality::parse_lossy(&request.quality),
        voice: request.voice.unwrap_or_else(|| settings.default_voice.clone()),
    })
}

/// Queues a job and runs its pipeline on a background task.
pub async fn submit(state: &ServerState, request: GenerateRequest) -> Result<Job, AppError> {
    let request = to_job_request(state, request)?;
    state.settings.ensure_dirs()?;

    let job = state.jobs.create(&request.topic).await;
    info!("[{}] Queued '{}'", job.job_id, request.topic);

    let pipeline = Arc::clone(&state.pipeline);
    let job_id = job.job_id.clone();
    tokio::spawn(async move {
        pipeline.run_job(&job_id, &request).await;
    });

    Ok(job)
}

/// Status of a job the store has forgotten, recovered from its final video on disk.
pub async fn recover_status(final_dir: &Path, job_id: &str) -> Option<RecoveredStatus> {
    let id = Path::new(job_id).file_name()?.to_str()?;
    let path = final_dir.join(format!("{}.mp4", id));
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return None;
    }
    Some(RecoveredStatus {
        job_id: id.to_string(),
        status: JobStatus::Completed,
        video_url: format!("/output/{}.mp4", id),
        message: "Recovered from the output volume; job details were lost on restart.".into(),
    })
}
