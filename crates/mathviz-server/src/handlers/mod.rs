//! HTTP route handlers for the job API.

pub mod jobs;
pub mod output;

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::{ServerState, VERSION};

/// Health check with the configured LLM.
pub async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.settings.llm_provider.clone(),
        model: state.settings.llm_model.clone(),
        version: VERSION,
    })
}

#[cfg(test)]
mod tests {
    use crate::tests::{body_json, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_model_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let res = crate::app(test_state(dir.path()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "claude");
        assert_eq!(body["version"], "2.0.0");
    }
}
