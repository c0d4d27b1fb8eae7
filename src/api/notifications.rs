//! Notification permission endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::notify::NotificationPermission;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PermissionState {
    pub permission: NotificationPermission,
}

/// GET /api/notifications/permission
pub async fn get_notification_permission(
    State(state): State<AppState>,
) -> ApiResult<PermissionState> {
    success(PermissionState {
        permission: state.notifier.permission(),
    })
}

/// POST /api/notifications/permission - Prompt for permission.
pub async fn request_notification_permission(
    State(state): State<AppState>,
) -> ApiResult<PermissionState> {
    match state.notifier.request_permission() {
        NotificationPermission::Denied => Err(AppError::PermissionDenied(
            "Notification permission denied".to_string(),
        )),
        permission => success(PermissionState { permission }),
    }
}
