//! Job submission, status polling and listing.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::dto::{GenerateRequest, GenerateResponse, JobsResponse};
use crate::error::AppError;
use crate::services;
use crate::ServerState;

/// Queues a video job. Returns 202 with the job id immediately.
pub async fn generate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    let job = services::jobs::submit(&state, request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            message: format!("Job queued. Poll /status/{} for progress.", job.job_id),
            job_id: job.job_id,
            status: job.status,
        }),
    ))
}

/// Current state of a job, falling back to the output volume after a restart.
pub async fn status(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    if let Some(job) = state.jobs.get(&job_id).await {
        return Ok(Json(job).into_response());
    }

    match services::jobs::recover_status(&state.settings.final_dir(), &job_id).await {
        Some(recovered) => Ok(Json(recovered).into_response()),
        None => Err(AppError::NotFound(format!("Job '{}' not found.", job_id))),
    }
}

/// All jobs, newest first.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<JobsResponse> {
    let jobs = state.jobs.list().await;
    Json(JobsResponse {
        total: jobs.len(),
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use crate::tests::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use mathviz_engine::{Job, JobStatus};
    use serde_json::json;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn generate_accepts_and_stores_job() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let res = crate::app(state.clone())
            .oneshot(post_json("/generate", json!({"topic": "eigenvalues of 2x2 matrices"})))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::ACCEPTED);
        let body = body_json(res).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert_eq!(job_id.len(), 10);
        assert_eq!(body["status"], "queued");
        assert_eq!(
            body["message"],
            format!("Job queued. Poll /status/{} for progress.", job_id)
        );

        let job = state.jobs.get(&job_id).await.unwrap();
        assert_eq!(job.topic, "eigenvalues of 2x2 matrices");
        assert!(dir.path().join("final").is_dir());
    }

    #[tokio::test]
    async fn short_topic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let res = crate::app(state.clone())
            .oneshot(post_json("/generate", json!({"topic": "ab"})))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(res).await["error"].as_str().unwrap().contains("at least 3"));
        assert!(state.jobs.is_empty().await);
    }

    #[tokio::test]
    async fn duration_outside_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = crate::app(state.clone());

        for mins in [0u64, 2, 11, 80_000_000] {
            let res = app
                .clone()
                .oneshot(post_json(
                    "/generate",
                    json!({"topic": "eigenvalues of 2x2 matrices", "duration_mins": mins}),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", mins);
            assert!(body_json(res).await["error"]
                .as_str()
                .unwrap()
                .contains("between 3 and 10"));
        }
        assert!(state.jobs.is_empty().await);

        let res = app
            .oneshot(post_json(
                "/generate",
                json!({"topic": "eigenvalues of 2x2 matrices", "duration_mins": 10}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn status_returns_stored_job() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let mut job = Job::new("abc1234567", "topic");
        job.status = JobStatus::Rendering;
        state.jobs.insert(job).await;

        let res = crate::app(state).oneshot(get("/status/abc1234567")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "rendering");
        assert_eq!(body["topic"], "topic");
    }

    #[tokio::test]
    async fn unknown_status_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let res = crate::app(test_state(dir.path()))
            .oneshot(get("/status/nope"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"], "Job 'nope' not found.");
    }

    #[tokio::test]
    async fn status_recovers_from_final_video() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("final")).unwrap();
        std::fs::write(dir.path().join("final/old123.mp4"), b"v").unwrap();

        let res = crate::app(test_state(dir.path()))
            .oneshot(get("/status/old123"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["video_url"], "/output/old123.mp4");
    }

    #[tokio::test]
    async fn jobs_lists_everything() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        state.jobs.insert(Job::new("a", "first")).await;
        state.jobs.insert(Job::new("b", "second")).await;

        let res = crate::app(state).oneshot(get("/jobs")).await.unwrap();
        let body = body_json(res).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["jobs"].as_array().unwrap().len(), 2);
    }
}
