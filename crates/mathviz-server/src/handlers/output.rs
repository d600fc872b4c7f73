//! Final video downloads.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::AppError;
use crate::services;
use crate::ServerState;

/// Streams `final/<filename>` as `video/mp4`.
pub async fn download(
    State(state): State<Arc<ServerState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (path, name) = services::output::resolve(&state.settings.final_dir(), &filename)
        .await
        .ok_or_else(|| AppError::NotFound("Video not found.".into()))?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| AppError::NotFound("Video not found.".into()))?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
        ],
        body,
    )
        .into_response())
}
