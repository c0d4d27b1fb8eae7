//! Video processing endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Largest upload accepted by the processing endpoint.
pub const MAX_VIDEO_BYTES: usize = 64 * 1024 * 1024;

/// POST /api/video/process - Hand raw video bytes to the processing service.
pub async fn process_video(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let processed = state.video.transcode(body.to_vec()).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        processed,
    )
        .into_response())
}
