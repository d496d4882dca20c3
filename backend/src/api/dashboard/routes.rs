//! Defines the HTTP routes for the dashboard data API.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{admin, general, log_activity, teacher};
use crate::AppState;

pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(general))
        .route("/api/dashboard/admin", get(admin))
        .route("/api/dashboard/teacher", get(teacher))
        .route("/api/dashboard/activity", post(log_activity))
}
