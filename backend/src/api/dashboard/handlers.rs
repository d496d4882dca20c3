//! Handler functions for the dashboard data API.

use adapters::{ActivityRequest, ApiMessage, DashboardKind, DashboardResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::debug;

use crate::auth::handlers::require_token;
use crate::errors::AppError;
use crate::AppState;

async fn feed(
    state: &AppState,
    headers: &HeaderMap,
    kind: DashboardKind,
) -> Result<Json<DashboardResponse>, AppError> {
    let token = require_token(headers)?;
    debug!(feed = kind.path(), "fetching dashboard feed");
    Ok(Json(state.identity.dashboard(&token, kind).await?))
}

pub async fn general(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    feed(&state, &headers, DashboardKind::General).await
}

pub async fn admin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    feed(&state, &headers, DashboardKind::Admin).await
}

pub async fn teacher(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, AppError> {
    feed(&state, &headers, DashboardKind::Teacher).await
}

pub async fn log_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ActivityRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    let token = require_token(&headers)?;
    Ok(Json(state.identity.log_activity(&token, &body).await?))
}
