//! Session API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::AppState;

/// Current session as reported to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub is_authenticated: bool,
    pub user: Option<User>,
}

/// POST /api/auth/login - Sign in with the demo credentials.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<User> {
    let user = state.auth.login(&request.email, &request.password).await?;
    state.start_session().await?;
    success(user)
}

/// POST /api/auth/register - Create an account and sign in.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    request.validate()?;

    let user = state
        .auth
        .register(&request.name, &request.email, &request.password)
        .await?;
    state.start_session().await?;
    success(user)
}

/// POST /api/auth/logout - End the session.
pub async fn logout(State(state): State<AppState>) -> ApiResult<()> {
    state.auth.logout().await?;
    state.end_session().await;
    success(())
}

/// GET /api/auth/session - Who is signed in.
pub async fn get_session(State(state): State<AppState>) -> ApiResult<SessionInfo> {
    let user = state.auth.current_user().await;
    success(SessionInfo {
        is_authenticated: user.is_some(),
        user,
    })
}
