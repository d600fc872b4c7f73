//! Request and response bodies for the job API.

use mathviz_engine::{Job, JobStatus};
use serde::{Deserialize, Serialize};

fn default_duration_mins() -> u32 {
    5
}

fn default_quality() -> String {
    "medium".into()
}

/// Body of `POST /generate`. Unset language and voice fall back to settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "default_duration_mins")]
    pub duration_mins: u32,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
}

/// Status reconstructed from the output volume for a job the store no longer knows.
#[derive(Debug, Serialize)]
pub struct RecoveredStatus {
    pub job_id: String,
    pub status: JobStatus,
    pub video_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub model: String,
    pub version: &'static str,
}
