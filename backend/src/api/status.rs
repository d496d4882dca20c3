//! Backend status indicator endpoints.
//!
//! Exposes the latest snapshot published by the status monitor and lets the front
//! end ask for an immediate re-check. Display only; nothing on the auth path reads it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::services::status::StatusSnapshot;
use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.status.snapshot())
}

/// Restarts the probe cycle; answers with the snapshot as it was before the restart.
pub async fn refresh(State(state): State<AppState>) -> (StatusCode, Json<StatusSnapshot>) {
    let snapshot = state.status.snapshot();
    state.status.refresh();
    (StatusCode::ACCEPTED, Json(snapshot))
}

pub fn status_router() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/status/refresh", post(refresh))
}
