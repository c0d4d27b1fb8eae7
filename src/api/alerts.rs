//! Alert API endpoints.

use axum::extract::{Path, Query, State};
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{Alert, AlertFilter};
use crate::AppState;

/// Filtered alert list with the unfiltered unread count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertList {
    pub alerts: Vec<Alert>,
    pub total: usize,
    pub unread_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub changed: usize,
}

/// GET /api/alerts - List alerts filtered by `q`, `status` and `type`.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> ApiResult<AlertList> {
    let alerts = state.alerts.filtered(&filter).await;
    let unread_count = state.alerts.unread_count().await;

    success(AlertList {
        total: alerts.len(),
        alerts,
        unread_count,
    })
}

/// GET /api/alerts/unread-count
pub async fn get_unread_count(State(state): State<AppState>) -> ApiResult<UnreadCount> {
    success(UnreadCount {
        unread_count: state.alerts.unread_count().await,
        total: state.alerts.len().await,
    })
}

/// POST /api/alerts/:id/read - Mark one alert as read.
pub async fn mark_alert_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Alert> {
    success(state.alerts.mark_as_read(&id).await?)
}

/// POST /api/alerts/read-all - Mark every alert as read.
pub async fn mark_all_alerts_read(State(state): State<AppState>) -> ApiResult<MarkedRead> {
    let changed = state.alerts.mark_all_as_read().await?;
    success(MarkedRead { changed })
}
