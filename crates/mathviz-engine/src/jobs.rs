//! In-memory job tracking.
//!
//! Jobs live only as long as the process. The server reconstructs the status
//! of finished jobs from the output volume after a restart.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

const JOB_ID_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Planning,
    GeneratingAudio,
    BuildingScenes,
    Rendering,
    Composing,
    Uploading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Planning => "planning",
            Self::GeneratingAudio => "generating_audio",
            Self::BuildingScenes => "building_scenes",
            Self::Rendering => "rendering",
            Self::Composing => "composing",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video generation job as reported by the status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub render_time_seconds: Option<f64>,
    pub video_url: Option<String>,
    pub total_beats: Option<usize>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beats_rendered: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beats_dropped: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_reasons: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_errors: Option<HashMap<String, String>>,
}

impl Job {
    /// A freshly queued job.
    pub fn new(job_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            topic: topic.into(),
            created_at: Utc::now(),
            render_time_seconds: None,
            video_url: None,
            total_beats: None,
            error: None,
            title: None,
            beats_rendered: None,
            beats_dropped: None,
            drop_reasons: None,
            render_errors: None,
        }
    }
}

/// Short job id: the first 10 hex characters of a v4 UUID.
pub fn new_job_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(JOB_ID_LEN);
    id
}

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a queued job under a fresh id and returns it.
    pub async fn create(&self, topic: &str) -> Job {
        let job = Job::new(new_job_id(), topic);
        self.insert(job.clone()).await;
        job
    }

    /// Registers a job under an id chosen by the caller.
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Applies `f` to the job. Returns false when the id is unknown.
    pub async fn update<F>(&self, job_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        match self.jobs.write().await.get_mut(job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    pub async fn set_status(&self, job_id: &str, status: JobStatus) -> bool {
        self.update(job_id, |job| job.status = status).await
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}
