//! Camera API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Camera, CameraFilter, CreateCameraRequest, UpdateCameraRequest};
use crate::AppState;

/// GET /api/cameras - List cameras, optionally filtered by `q` and `status`.
pub async fn list_cameras(
    State(state): State<AppState>,
    Query(filter): Query<CameraFilter>,
) -> ApiResult<Vec<Camera>> {
    success(state.cameras.filtered(&filter).await)
}

/// GET /api/cameras/:id - Get a single camera.
pub async fn get_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Camera> {
    match state.cameras.get(&id).await {
        Some(camera) => success(camera),
        None => Err(AppError::NotFound(format!("Camera {} not found", id))),
    }
}

/// POST /api/cameras - Register a camera.
pub async fn create_camera(
    State(state): State<AppState>,
    Json(request): Json<CreateCameraRequest>,
) -> ApiResult<Camera> {
    success(state.cameras.add(&request).await?)
}

/// PUT /api/cameras/:id - Update a camera.
pub async fn update_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCameraRequest>,
) -> ApiResult<Camera> {
    success(state.cameras.update(&id, &request).await?)
}

/// DELETE /api/cameras/:id - Remove a camera.
pub async fn delete_camera(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.cameras.remove(&id).await?;
    success(())
}
