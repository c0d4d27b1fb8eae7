//! Dashboard API endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::dashboard::DashboardSummary;
use crate::AppState;

/// GET /api/dashboard - Stats, recent alerts and camera summary.
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    let cameras = state.cameras.list().await;
    let alerts = state.alerts.list().await;
    success(DashboardSummary::build(&cameras, &alerts, state.clock.now()))
}
